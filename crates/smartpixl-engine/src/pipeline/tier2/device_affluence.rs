//! Device affluence (spec §4.6 tier 2): classifies the GPU/CPU/memory/
//! resolution/platform tuple into LOW/MID/HIGH via a static reference
//! table of GPU model substrings. Outputs `_srv_affluence`, `_srv_gpuTier`.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    Low,
    Mid,
    High,
}

impl Tier {
    fn as_str(self) -> &'static str {
        match self {
            Tier::Low => "LOW",
            Tier::Mid => "MID",
            Tier::High => "HIGH",
        }
    }

    fn max(self, other: Tier) -> Tier {
        use Tier::*;
        match (self, other) {
            (High, _) | (_, High) => High,
            (Mid, _) | (_, Mid) => Mid,
            _ => Low,
        }
    }
}

/// GPU model substrings mapped to a tier, highest-specificity first. A
/// discrete high-end GPU beats an integrated one; anything unrecognized
/// falls through to `classify_by_heuristics`.
const GPU_TIERS: &[(&str, Tier)] = &[
    ("rtx 40", Tier::High),
    ("rtx 30", Tier::High),
    ("rtx 20", Tier::High),
    ("radeon rx 7", Tier::High),
    ("radeon rx 6", Tier::High),
    ("apple m3", Tier::High),
    ("apple m2", Tier::High),
    ("gtx 16", Tier::Mid),
    ("gtx 10", Tier::Mid),
    ("radeon rx 5", Tier::Mid),
    ("apple m1", Tier::Mid),
    ("intel iris", Tier::Mid),
    ("intel uhd", Tier::Low),
    ("intel hd graphics", Tier::Low),
    ("mali-", Tier::Low),
    ("adreno", Tier::Low),
    ("powervr", Tier::Low),
    ("swiftshader", Tier::Low),
    ("llvmpipe", Tier::Low),
];

fn gpu_tier(gpu: &str) -> Option<Tier> {
    let lowered = gpu.to_ascii_lowercase();
    GPU_TIERS.iter().find(|(marker, _)| lowered.contains(marker)).map(|(_, tier)| *tier)
}

fn memory_tier(device_memory_gb: Option<f64>) -> Tier {
    match device_memory_gb {
        Some(gb) if gb >= 16.0 => Tier::High,
        Some(gb) if gb >= 8.0 => Tier::Mid,
        Some(_) => Tier::Low,
        None => Tier::Low,
    }
}

fn resolution_tier(screen_width: Option<u32>) -> Tier {
    match screen_width {
        Some(w) if w >= 2560 => Tier::High,
        Some(w) if w >= 1920 => Tier::Mid,
        Some(_) => Tier::Low,
        None => Tier::Low,
    }
}

pub fn analyze(params: &HashMap<String, String>, pairs: &mut Vec<(&'static str, String)>) {
    let gpu = params.get("gpu").map(String::as_str).unwrap_or("");
    if gpu.is_empty() {
        return;
    }

    let gpu_tier = gpu_tier(gpu).unwrap_or(Tier::Mid);
    let mem_tier = memory_tier(params.get("deviceMemory").and_then(|v| v.parse().ok()));
    let res_tier = resolution_tier(params.get("sw").and_then(|v| v.parse().ok()));

    // The overall affluence score favors the strongest signal rather than
    // averaging — one high-end component (a discrete GPU) is a stronger
    // affluence signal than three mid-range ones agreeing.
    let overall = gpu_tier.max(mem_tier).max(res_tier);

    pairs.push(("gpuTier", gpu_tier.as_str().to_string()));
    pairs.push(("affluence", overall.as_str().to_string()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_gpu_param_is_a_no_op() {
        let mut pairs = Vec::new();
        analyze(&HashMap::new(), &mut pairs);
        assert!(pairs.is_empty());
    }

    #[test]
    fn high_end_discrete_gpu_classifies_high() {
        let mut params = HashMap::new();
        params.insert("gpu".to_string(), "NVIDIA GeForce RTX 4090".to_string());
        let mut pairs = Vec::new();
        analyze(&params, &mut pairs);
        assert!(pairs.contains(&("gpuTier", "HIGH".to_string())));
        assert!(pairs.contains(&("affluence", "HIGH".to_string())));
    }

    #[test]
    fn integrated_low_end_gpu_classifies_low() {
        let mut params = HashMap::new();
        params.insert("gpu".to_string(), "Intel(R) UHD Graphics 620".to_string());
        let mut pairs = Vec::new();
        analyze(&params, &mut pairs);
        assert!(pairs.contains(&("gpuTier", "LOW".to_string())));
    }

    #[test]
    fn large_screen_bumps_overall_affluence_above_gpu_alone() {
        let mut params = HashMap::new();
        params.insert("gpu".to_string(), "Intel(R) UHD Graphics 620".to_string());
        params.insert("sw".to_string(), "3440".to_string());
        let mut pairs = Vec::new();
        analyze(&params, &mut pairs);
        assert!(pairs.contains(&("gpuTier", "LOW".to_string())));
        assert!(pairs.contains(&("affluence", "HIGH".to_string())));
    }
}
