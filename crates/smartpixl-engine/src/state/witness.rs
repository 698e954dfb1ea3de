//! Cross-customer witness table (spec §3.3, §4.6 tier-2 "Cross-customer
//! witness"): for each `(IP, canvasFP)` key, a bounded, time-windowed set
//! of distinct `CompanyID` touches. Evicted 2h after last touch.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

const TTL_SECS: i64 = 2 * 3600;
const WINDOW_5M_SECS: i64 = 5 * 60;
const WINDOW_1H_SECS: i64 = 3600;
const MAX_TOUCHES_PER_KEY: usize = 128;

/// Outcome of recording one touch: the distinct-company counts in each
/// window, used by the tier-2 analyzer to decide whether to fire
/// `_srv_crossCustAlert`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WitnessResult {
    pub distinct_companies_5m: usize,
    pub distinct_companies_1h: usize,
}

struct WitnessEntry {
    touches: Vec<(String, DateTime<Utc>)>,
    last_touch: DateTime<Utc>,
}

pub struct CrossCustomerWitness {
    entries: DashMap<(IpAddr, String), WitnessEntry>,
}

impl Default for CrossCustomerWitness {
    fn default() -> Self {
        Self::new()
    }
}

impl CrossCustomerWitness {
    pub fn new() -> Self {
        Self { entries: DashMap::new() }
    }

    /// Record a touch from `company_id` at `(ip, canvas_fp)` and return the
    /// distinct-company counts over the 5-minute and 1-hour windows,
    /// including this touch.
    pub fn observe(&self, ip: IpAddr, canvas_fp: &str, company_id: &str, now: DateTime<Utc>) -> WitnessResult {
        let key = (ip, canvas_fp.to_string());
        let mut entry = self.entries.entry(key).or_insert_with(|| WitnessEntry {
            touches: Vec::new(),
            last_touch: now,
        });

        entry.touches.retain(|(_, ts)| (now - *ts).num_seconds() <= WINDOW_1H_SECS);
        entry.touches.push((company_id.to_string(), now));
        if entry.touches.len() > MAX_TOUCHES_PER_KEY {
            let excess = entry.touches.len() - MAX_TOUCHES_PER_KEY;
            entry.touches.drain(0..excess);
        }
        entry.last_touch = now;

        let mut seen_5m: HashMap<&str, ()> = HashMap::new();
        let mut seen_1h: HashMap<&str, ()> = HashMap::new();
        for (company, ts) in &entry.touches {
            let age = (now - *ts).num_seconds();
            if age <= WINDOW_1H_SECS {
                seen_1h.insert(company.as_str(), ());
            }
            if age <= WINDOW_5M_SECS {
                seen_5m.insert(company.as_str(), ());
            }
        }

        WitnessResult {
            distinct_companies_5m: seen_5m.len(),
            distinct_companies_1h: seen_1h.len(),
        }
    }

    /// Evict entries idle past the 2-hour TTL. Returns the number removed.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| (now - entry.last_touch).num_seconds() <= TTL_SECS);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub type SharedWitness = Arc<CrossCustomerWitness>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_company_never_alerts() {
        let w = CrossCustomerWitness::new();
        let now = Utc::now();
        let ip: IpAddr = "203.0.113.9".parse().unwrap();
        for _ in 0..5 {
            let r = w.observe(ip, "fp1", "ACME", now);
            assert_eq!(r.distinct_companies_5m, 1);
        }
    }

    #[test]
    fn three_companies_in_five_minutes_triggers_threshold() {
        let w = CrossCustomerWitness::new();
        let now = Utc::now();
        let ip: IpAddr = "203.0.113.9".parse().unwrap();
        w.observe(ip, "fp1", "ACME", now);
        w.observe(ip, "fp1", "GLOBEX", now);
        let r = w.observe(ip, "fp1", "INITECH", now);
        assert_eq!(r.distinct_companies_5m, 3);
        assert!(r.distinct_companies_5m >= 3);
    }

    #[test]
    fn ten_companies_in_an_hour_triggers_hourly_threshold() {
        let w = CrossCustomerWitness::new();
        let now = Utc::now();
        let ip: IpAddr = "203.0.113.9".parse().unwrap();
        let mut last = WitnessResult { distinct_companies_5m: 0, distinct_companies_1h: 0 };
        for i in 0..10i64 {
            let ts = now + chrono::Duration::minutes(i * 6);
            last = w.observe(ip, "fp1", &format!("company{i}"), ts);
        }
        assert_eq!(last.distinct_companies_1h, 10);
    }

    #[test]
    fn sweep_evicts_entries_past_two_hour_ttl() {
        let w = CrossCustomerWitness::new();
        let now = Utc::now();
        w.observe("203.0.113.9".parse().unwrap(), "fp1", "ACME", now);
        assert_eq!(w.len(), 1);
        let later = now + chrono::Duration::hours(3);
        assert_eq!(w.sweep(later), 1);
        assert!(w.is_empty());
    }
}
