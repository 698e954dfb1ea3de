//! Dead-internet index (spec §4.6 tier 3): per-company rolling aggregate
//! over the last hour, published on every record of that company as
//! `_srv_deadInternetIdx=0..100`. "Suspicious" is any hit this pipeline has
//! already flagged by the time this analyzer runs — last in tier order so
//! it sees every earlier tier's findings.

use crate::state::company_rollup::CompanyRollup;
use chrono::{DateTime, Utc};

const SUSPICIOUS_MARKERS: &[&str] = &[
    "knownBot",
    "fpAlert",
    "rapidFire",
    "subSecDupe",
    "subnetAlert",
    "crossCustAlert",
    "contradictions",
    "replayDetected",
    "deviceAgeAnomaly",
    "botTrap",
];

fn is_suspicious(params: &std::collections::HashMap<String, String>, pairs: &[(&'static str, String)]) -> bool {
    let prefixed_hit = SUSPICIOUS_MARKERS
        .iter()
        .any(|marker| params.contains_key(&format!("_srv_{marker}")));
    let this_pass_hit = pairs.iter().any(|(k, _)| SUSPICIOUS_MARKERS.contains(k));
    prefixed_hit || this_pass_hit
}

pub fn analyze(
    rollup: &CompanyRollup,
    company_id: &str,
    params: &std::collections::HashMap<String, String>,
    now: DateTime<Utc>,
    pairs: &mut Vec<(&'static str, String)>,
) {
    let suspicious = is_suspicious(params, pairs);
    let index = rollup.record(company_id, suspicious, now);
    pairs.push(("deadInternetIdx", index.to_string()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn clean_hit_contributes_zero() {
        let rollup = CompanyRollup::new();
        let mut pairs = Vec::new();
        analyze(&rollup, "ACME", &HashMap::new(), Utc::now(), &mut pairs);
        assert!(pairs.contains(&("deadInternetIdx", "0".to_string())));
    }

    #[test]
    fn a_flagged_earlier_pair_this_pass_counts_as_suspicious() {
        let rollup = CompanyRollup::new();
        let mut pairs = vec![("knownBot", "1".to_string())];
        analyze(&rollup, "ACME", &HashMap::new(), Utc::now(), &mut pairs);
        assert!(pairs.contains(&("deadInternetIdx", "100".to_string())));
    }
}
