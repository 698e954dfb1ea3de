//! The edge process library: HTTP dispatcher, capture, fast-enrichment
//! bank, pipe client, failover writer (spec §2 "Edge").
//!
//! Split into a library target plus a thin `main.rs`, mirroring the
//! teacher's `daemon` crate layout (`daemon/src/lib.rs` + `daemon/src/
//! main.rs`) so the binary's wiring is independently testable.

pub mod config;
pub mod enrich;
pub mod http;
pub mod pipe;
pub mod state;

use std::sync::Arc;
use std::time::Instant;

use config::EdgeConfig;
use enrich::FastEnrichmentBank;
use http::script_cache::ScriptCache;
use pipe::client::PipeClient;
use pipe::failover::FailoverWriter;
use smartpixl_core::ip::DatacenterTrie;
use state::fingerprint_history::FingerprintHistory;
use state::geo_cache::GeoCache;
use state::hit_log::HitLog;
use state::ip_velocity::IpVelocity;

const RAPID_FIRE_WINDOW_SECS: u64 = 300;
const SCRIPT_TEMPLATE: &str = include_str!("../assets/fingerprint.js.tmpl");

/// Everything a request handler needs, built once at start-up and shared
/// behind an `Arc` (spec §5: request workers never own per-request state
/// beyond the record itself).
pub struct AppState {
    pub config: Arc<EdgeConfig>,
    pub enrichment_bank: FastEnrichmentBank,
    pub pipe_client: Arc<PipeClient>,
    pub failover_writer: Arc<FailoverWriter>,
    pub script_cache: ScriptCache,
    pub started_at: Instant,
}

impl AppState {
    pub fn build(config: Arc<EdgeConfig>) -> Self {
        let failover_writer = Arc::new(FailoverWriter::new(config.failover_directory.clone(), config.queue_capacity));
        let pipe_client = Arc::new(PipeClient::new(
            config.queue_capacity,
            std::path::PathBuf::from(&config.pipe_name),
            uuid::Uuid::new_v4().to_string(),
            failover_writer.clone(),
        ));

        let datacenter_trie: DatacenterTrie<String> =
            DatacenterTrie::new(state::datacenter_trie::build_snapshot(&config.datacenter_cidr_lists));

        let enrichment_bank = FastEnrichmentBank {
            fingerprint_history: Arc::new(FingerprintHistory::new(config.fingerprint_history_ttl_secs)),
            ip_velocity: Arc::new(IpVelocity::new(RAPID_FIRE_WINDOW_SECS)),
            hit_log: Arc::new(HitLog::new()),
            datacenter_trie,
            geo_cache: Arc::new(GeoCache::new(config.geo_cache_warm_ttl_secs, config.queue_capacity)),
        };

        Self {
            config,
            enrichment_bank,
            pipe_client,
            failover_writer,
            script_cache: ScriptCache::new(SCRIPT_TEMPLATE.to_string()),
            started_at: Instant::now(),
        }
    }
}
