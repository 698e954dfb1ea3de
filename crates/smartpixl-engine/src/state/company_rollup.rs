//! Per-company rolling aggregate (spec §4.6 tier-3 "Dead-internet index"):
//! over the trailing hour, the fraction of a company's hits flagged
//! suspicious by an earlier analyzer. Published on every record of that
//! company as `_srv_deadInternetIdx=0..100`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

const WINDOW_SECS: i64 = 3600;
const IDLE_EVICT_SECS: i64 = 2 * 3600;
const MAX_TRACKED_HITS: usize = 4096;

struct CompanyEntry {
    hits: Vec<(DateTime<Utc>, bool)>,
    last_touch: DateTime<Utc>,
}

pub struct CompanyRollup {
    companies: DashMap<String, CompanyEntry>,
}

impl Default for CompanyRollup {
    fn default() -> Self {
        Self::new()
    }
}

impl CompanyRollup {
    pub fn new() -> Self {
        Self { companies: DashMap::new() }
    }

    /// Record one hit for `company_id`, `suspicious` or not, and return the
    /// company's current index (0..100) over the trailing hour including
    /// this hit.
    pub fn record(&self, company_id: &str, suspicious: bool, now: DateTime<Utc>) -> u32 {
        let mut entry = self.companies.entry(company_id.to_string()).or_insert_with(|| CompanyEntry {
            hits: Vec::new(),
            last_touch: now,
        });

        entry.hits.retain(|(ts, _)| (now - *ts).num_seconds() <= WINDOW_SECS);
        entry.hits.push((now, suspicious));
        if entry.hits.len() > MAX_TRACKED_HITS {
            let excess = entry.hits.len() - MAX_TRACKED_HITS;
            entry.hits.drain(0..excess);
        }
        entry.last_touch = now;

        let total = entry.hits.len();
        let flagged = entry.hits.iter().filter(|(_, s)| *s).count();
        if total == 0 {
            0
        } else {
            ((flagged as f64 / total as f64) * 100.0).round() as u32
        }
    }

    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let before = self.companies.len();
        self.companies.retain(|_, entry| (now - entry.last_touch).num_seconds() <= IDLE_EVICT_SECS);
        before - self.companies.len()
    }

    pub fn len(&self) -> usize {
        self.companies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }
}

pub type SharedCompanyRollup = Arc<CompanyRollup>;
