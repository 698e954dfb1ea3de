//! Cross-customer witness analyzer (spec §4.6 tier 2): wraps
//! [`crate::state::witness::CrossCustomerWitness`], converting its
//! distinct-company counts into the `_srv_crossCust*` pairs. Fires
//! `_srv_crossCustAlert=1` when >=3 distinct companies touched this
//! `(ip, canvasFP)` pair in 5 minutes, or >=10 in 1 hour.

use std::collections::HashMap;
use std::net::IpAddr;

use chrono::{DateTime, Utc};

use crate::state::witness::CrossCustomerWitness;

const ALERT_THRESHOLD_5M: usize = 3;
const ALERT_THRESHOLD_1H: usize = 10;

pub fn analyze(
    witness: &CrossCustomerWitness,
    ip: IpAddr,
    company_id: &str,
    params: &HashMap<String, String>,
    now: DateTime<Utc>,
    pairs: &mut Vec<(&'static str, String)>,
) {
    let canvas_fp = params.get("canvasFP").map(String::as_str).unwrap_or("");
    if canvas_fp.is_empty() {
        return;
    }

    let result = witness.observe(ip, canvas_fp, company_id, now);

    let alert_5m = result.distinct_companies_5m >= ALERT_THRESHOLD_5M;
    let alert_1h = result.distinct_companies_1h >= ALERT_THRESHOLD_1H;

    pairs.push(("crossCustHits", result.distinct_companies_5m.to_string()));
    pairs.push(("crossCustWindow", result.distinct_companies_1h.to_string()));
    if alert_5m || alert_1h {
        pairs.push(("crossCustAlert", "1".to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_canvas_fingerprint_is_a_no_op() {
        let witness = CrossCustomerWitness::new();
        let mut pairs = Vec::new();
        analyze(&witness, "203.0.113.9".parse().unwrap(), "ACME", &HashMap::new(), Utc::now(), &mut pairs);
        assert!(pairs.is_empty());
    }

    #[test]
    fn single_company_never_alerts() {
        let witness = CrossCustomerWitness::new();
        let mut params = HashMap::new();
        params.insert("canvasFP".to_string(), "abc".to_string());
        let mut pairs = Vec::new();
        analyze(&witness, "203.0.113.9".parse().unwrap(), "ACME", &params, Utc::now(), &mut pairs);
        assert!(!pairs.iter().any(|(k, _)| *k == "crossCustAlert"));
    }

    #[test]
    fn three_companies_in_five_minutes_fires_alert() {
        let witness = CrossCustomerWitness::new();
        let mut params = HashMap::new();
        params.insert("canvasFP".to_string(), "abc".to_string());
        let ip: IpAddr = "203.0.113.9".parse().unwrap();
        let now = Utc::now();
        let mut pairs = Vec::new();
        analyze(&witness, ip, "ACME", &params, now, &mut pairs);
        analyze(&witness, ip, "GLOBEX", &params, now, &mut pairs);
        pairs.clear();
        analyze(&witness, ip, "INITECH", &params, now, &mut pairs);
        assert!(pairs.iter().any(|(k, v)| *k == "crossCustAlert" && v == "1"));
    }
}
