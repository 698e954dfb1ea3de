//! Device-age estimation (spec §4.6 tier 3): GPU model → release-year
//! table; flags `_srv_deviceAgeAnomaly=1` when an old GPU contradicts
//! otherwise-modern behavior (modern browser, datacenter IP, zero mouse
//! entropy).

use std::collections::HashMap;

const GPU_RELEASE_YEARS: &[(&str, u32)] = &[
    ("rtx 40", 2022),
    ("rtx 30", 2020),
    ("rtx 20", 2018),
    ("gtx 16", 2019),
    ("gtx 10", 2016),
    ("gtx 9", 2014),
    ("gtx 7", 2013),
    ("radeon rx 7", 2022),
    ("radeon rx 6", 2020),
    ("radeon rx 5", 2019),
    ("apple m3", 2023),
    ("apple m2", 2022),
    ("apple m1", 2020),
    ("intel iris", 2017),
    ("intel uhd", 2015),
    ("intel hd graphics", 2012),
    ("geforce 9", 2008),
    ("radeon hd", 2009),
];

const OLD_GPU_CUTOFF_YEAR: u32 = 2014;
const CURRENT_YEAR_ESTIMATE: u32 = 2026;

fn release_year(gpu: &str) -> Option<u32> {
    let lowered = gpu.to_ascii_lowercase();
    GPU_RELEASE_YEARS.iter().find(|(marker, _)| lowered.contains(marker)).map(|(_, year)| *year)
}

pub fn analyze(params: &HashMap<String, String>, pairs: &mut Vec<(&'static str, String)>) {
    let gpu = params.get("gpu").map(String::as_str).unwrap_or("");
    let Some(year) = release_year(gpu) else {
        return;
    };

    let age_years = CURRENT_YEAR_ESTIMATE.saturating_sub(year);
    pairs.push(("deviceAgeYear", year.to_string()));
    pairs.push(("deviceAgeYears", age_years.to_string()));

    if year > OLD_GPU_CUTOFF_YEAR {
        return;
    }

    let modern_browser = params
        .get("_srv_browserVer")
        .and_then(|v| v.split('.').next())
        .and_then(|v| v.parse::<u32>().ok())
        .map(|major| major >= 100)
        .unwrap_or(false);
    let datacenter_ip = params.contains_key("_srv_dc");
    let zero_mouse_entropy = params.get("mousePath").map(|p| p.is_empty()).unwrap_or(true);

    if modern_browser && datacenter_ip && zero_mouse_entropy {
        pairs.push(("deviceAgeAnomaly", "1".to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_gpu_is_a_no_op() {
        let mut pairs = Vec::new();
        analyze(&HashMap::new(), &mut pairs);
        assert!(pairs.is_empty());
    }

    #[test]
    fn old_gpu_alone_does_not_anomaly() {
        let mut params = HashMap::new();
        params.insert("gpu".to_string(), "Intel HD Graphics 4000".to_string());
        let mut pairs = Vec::new();
        analyze(&params, &mut pairs);
        assert!(!pairs.iter().any(|(k, _)| *k == "deviceAgeAnomaly"));
    }

    #[test]
    fn release_year_and_computed_age_are_both_emitted() {
        let mut params = HashMap::new();
        params.insert("gpu".to_string(), "NVIDIA GeForce RTX 3080".to_string());
        let mut pairs = Vec::new();
        analyze(&params, &mut pairs);
        assert!(pairs.contains(&("deviceAgeYear", "2020".to_string())));
        assert!(pairs.contains(&("deviceAgeYears", (CURRENT_YEAR_ESTIMATE - 2020).to_string())));
    }

    #[test]
    fn old_gpu_with_modern_browser_datacenter_ip_and_no_mouse_flags_anomaly() {
        let mut params = HashMap::new();
        params.insert("gpu".to_string(), "Intel HD Graphics 4000".to_string());
        params.insert("_srv_browserVer".to_string(), "120.0.0.0".to_string());
        params.insert("_srv_dc".to_string(), "A".to_string());
        let mut pairs = Vec::new();
        analyze(&params, &mut pairs);
        assert!(pairs.contains(&("deviceAgeAnomaly", "1".to_string())));
    }
}
