//! Tier 2 — cross-request state (spec §4.6): cross-customer witness,
//! session stitching, lead-quality scoring, device affluence.

pub mod cross_customer;
pub mod device_affluence;
pub mod lead_score;
pub mod session_stitcher;

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::state::session::SessionRegistry;
use crate::state::witness::CrossCustomerWitness;

pub struct Tier2Context {
    pub witness: Arc<CrossCustomerWitness>,
    pub sessions: Arc<SessionRegistry>,
}

impl Tier2Context {
    pub fn new(witness: Arc<CrossCustomerWitness>, sessions: Arc<SessionRegistry>) -> Self {
        Self { witness, sessions }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn run(
        &self,
        ip: Option<IpAddr>,
        company_id: &str,
        request_path: &str,
        user_agent: &str,
        params: &HashMap<String, String>,
        now: DateTime<Utc>,
        pairs: &mut Vec<(&'static str, String)>,
    ) {
        if let Some(ip) = ip {
            cross_customer::analyze(&self.witness, ip, company_id, params, now, pairs);
        }
        session_stitcher::analyze(&self.sessions, params, user_agent, request_path, now, pairs);
        device_affluence::analyze(params, pairs);
        lead_score::analyze(params, pairs);
    }
}
