//! Analyzer 2 — fingerprint stability (spec §4.2.2).
//!
//! Fires `_srv_fpAlert=1` plus `_srv_fpObs`, `_srv_fpUniq`, `_srv_fpRate5m`
//! when any of: ≥3 distinct composites from one IP in 24h, observation
//! count above threshold, or rate per 5 min above threshold.

use std::collections::HashMap;
use std::net::IpAddr;

use chrono::{DateTime, Utc};

use crate::state::fingerprint_history::FingerprintHistory;

const DISTINCT_COMPOSITE_THRESHOLD: usize = 3;
const OBSERVATION_COUNT_THRESHOLD: u64 = 50;
const RATE_5M_THRESHOLD: usize = 10;

/// Build the canvas|webgl|audio composite fingerprint from script params.
/// Returns `None` when the browser supplied none of the three — a legacy
/// hit has no fingerprint to stabilize against.
fn composite_fingerprint(params: &HashMap<String, String>) -> Option<String> {
    let canvas = params.get("canvasFP").map(String::as_str).unwrap_or("");
    let webgl = params.get("webglFP").map(String::as_str).unwrap_or("");
    let audio = params.get("audioFP").map(String::as_str).unwrap_or("");
    if canvas.is_empty() && webgl.is_empty() && audio.is_empty() {
        None
    } else {
        Some(format!("{canvas}|{webgl}|{audio}"))
    }
}

pub fn analyze(
    history: &FingerprintHistory,
    ip: IpAddr,
    params: &HashMap<String, String>,
    now: DateTime<Utc>,
    pairs: &mut Vec<(&'static str, String)>,
) {
    let Some(composite) = composite_fingerprint(params) else {
        return;
    };

    let obs = history.observe(ip, &composite, now);

    let suspicious = obs.distinct_composites_24h >= DISTINCT_COMPOSITE_THRESHOLD
        || obs.observation_count >= OBSERVATION_COUNT_THRESHOLD
        || obs.rate_per_5m >= RATE_5M_THRESHOLD;

    if suspicious {
        pairs.push(("fpAlert", "1".to_string()));
        pairs.push(("fpObs", obs.observation_count.to_string()));
        pairs.push(("fpUniq", obs.distinct_composites_24h.to_string()));
        pairs.push(("fpRate5m", obs.rate_per_5m.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params_with_canvas(fp: &str) -> HashMap<String, String> {
        let mut m = HashMap::new();
        m.insert("canvasFP".to_string(), fp.to_string());
        m
    }

    #[test]
    fn no_fingerprint_params_does_nothing() {
        let history = FingerprintHistory::new(86_400);
        let mut pairs = Vec::new();
        analyze(&history, "203.0.113.9".parse().unwrap(), &HashMap::new(), Utc::now(), &mut pairs);
        assert!(pairs.is_empty());
    }

    #[test]
    fn single_stable_observation_does_not_alert() {
        let history = FingerprintHistory::new(86_400);
        let mut pairs = Vec::new();
        analyze(
            &history,
            "203.0.113.9".parse().unwrap(),
            &params_with_canvas("abc"),
            Utc::now(),
            &mut pairs,
        );
        assert!(pairs.is_empty());
    }

    #[test]
    fn three_distinct_composites_trigger_alert() {
        let history = FingerprintHistory::new(86_400);
        let ip = "203.0.113.9".parse().unwrap();
        let now = Utc::now();
        let mut pairs = Vec::new();
        analyze(&history, ip, &params_with_canvas("a"), now, &mut pairs);
        analyze(&history, ip, &params_with_canvas("b"), now, &mut pairs);
        pairs.clear();
        analyze(&history, ip, &params_with_canvas("c"), now, &mut pairs);
        assert!(pairs.iter().any(|(k, v)| *k == "fpAlert" && v == "1"));
    }
}
