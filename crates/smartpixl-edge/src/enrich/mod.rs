//! The fast-enrichment bank (spec §4.2): seven analyzers run in fixed
//! order over every captured record, each appending `_srv_*` pairs.
//! Analyzers never block — every state lookup here is an in-memory map
//! read, not I/O.
//!
//! Write discipline (spec §4.2): a `Vec<(&'static str, String)>` accumulates
//! pairs and the query string is only rebuilt if at least one pair fired,
//! matching the teacher's general preference for avoiding allocation on a
//! path with no work to do.

pub mod datacenter;
pub mod fingerprint;
pub mod geo;
pub mod hit_type;
pub mod ip_class;
pub mod tz_mismatch;
pub mod velocity;

use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use smartpixl_core::ip::DatacenterTrie;
pub use smartpixl_core::qs::{append_pairs, parse_query_params};
use smartpixl_core::Record;

use crate::state::fingerprint_history::FingerprintHistory;
use crate::state::geo_cache::GeoCache;
use crate::state::hit_log::HitLog;
use crate::state::ip_velocity::IpVelocity;

/// Shared state the bank's analyzers read from (spec §3.2). Cloned cheaply
/// — every field is an `Arc`-backed concurrent structure.
pub struct FastEnrichmentBank {
    pub fingerprint_history: Arc<FingerprintHistory>,
    pub ip_velocity: Arc<IpVelocity>,
    pub hit_log: Arc<HitLog>,
    pub datacenter_trie: DatacenterTrie<String>,
    pub geo_cache: Arc<GeoCache>,
}

impl FastEnrichmentBank {
    /// Run all seven analyzers over `record`, returning a new record with
    /// any `_srv_*` pairs appended to its query string (or the same record,
    /// unmodified, if nothing fired). `bot_trap` appends `_srv_botTrap=1`
    /// for requests whose URL didn't match a recognized pixel shape
    /// (spec §4.2: "Bot-trap records ... also carry `_srv_botTrap=1`").
    pub fn enrich(&self, record: &Record, now: DateTime<Utc>, bot_trap: bool) -> Record {
        let ip: Option<IpAddr> = record.remote_address.parse().ok();
        let params = parse_query_params(&record.query_string);
        let mut pairs: Vec<(&str, String)> = Vec::new();

        hit_type::analyze(&params, &mut pairs);

        if let Some(ip) = ip {
            fingerprint::analyze(&self.fingerprint_history, ip, &params, now, &mut pairs);
            velocity::analyze(&self.ip_velocity, &self.hit_log, ip, now, &mut pairs);
            datacenter::analyze(&self.datacenter_trie, ip, &mut pairs);
            ip_class::analyze(ip, &mut pairs);
            let geo = geo::analyze(&self.geo_cache, ip, &mut pairs);
            tz_mismatch::analyze(geo.as_ref(), &params, &mut pairs);
        }

        if bot_trap {
            pairs.push(("botTrap", "1".to_string()));
        }

        if pairs.is_empty() {
            record.clone()
        } else {
            record.with_query_string(append_pairs(&record.query_string, &pairs))
        }
    }
}
