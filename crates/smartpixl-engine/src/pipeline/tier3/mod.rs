//! Tier 3 — anomaly and asymmetric detection (spec §4.6): cultural
//! consistency, device-age estimation, the contradiction matrix,
//! behavioral replay, and the dead-internet index.

pub mod behavioral_replay;
pub mod contradiction_matrix;
pub mod cultural_consistency;
pub mod dead_internet_index;
pub mod device_age;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::state::company_rollup::CompanyRollup;
use crate::state::replay::ReplayIndex;

pub struct Tier3Context {
    pub replay_index: Arc<ReplayIndex>,
    pub company_rollup: Arc<CompanyRollup>,
}

impl Tier3Context {
    pub fn new(replay_index: Arc<ReplayIndex>, company_rollup: Arc<CompanyRollup>) -> Self {
        Self { replay_index, company_rollup }
    }

    pub fn run(
        &self,
        company_id: &str,
        params: &HashMap<String, String>,
        now: DateTime<Utc>,
        pairs: &mut Vec<(&'static str, String)>,
    ) {
        cultural_consistency::analyze(params, pairs);
        device_age::analyze(params, pairs);
        contradiction_matrix::analyze(params, pairs);
        behavioral_replay::analyze(&self.replay_index, params, now, pairs);
        // Last: sees every flag this record has accumulated so far.
        dead_internet_index::analyze(&self.company_rollup, company_id, params, now, pairs);
    }
}
