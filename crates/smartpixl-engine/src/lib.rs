//! The engine process library: pipe server, failover catch-up, tiered
//! enrichment pipeline, bulk writer, ETL trigger (spec §2 "Engine").
//!
//! Split into a library target plus a thin `main.rs`, mirroring the
//! teacher's `daemon` crate layout and `smartpixl-edge`'s own split.

pub mod config;
pub mod etl;
pub mod http;
pub mod pipe;
pub mod pipeline;
pub mod state;
pub mod writer;

use std::sync::Arc;
use std::time::{Duration, Instant};

use config::EngineConfig;
use pipeline::tier1::Tier1Context;
use pipeline::tier2::Tier2Context;
use pipeline::tier3::Tier3Context;
use pipeline::EnrichmentPipeline;
use smartpixl_core::queue::DropOldestQueue;
use smartpixl_core::Record;
use state::company_rollup::CompanyRollup;
use state::replay::ReplayIndex;
use state::session::SessionRegistry;
use state::witness::CrossCustomerWitness;
use writer::WriterHandle;

/// Everything the pipe server, pipeline consumer, and internal HTTP
/// endpoint share, built once at start-up behind an `Arc` (spec §5).
pub struct EngineState {
    pub config: Arc<EngineConfig>,
    /// Raw records as the pipe server and catch-up service hand them in,
    /// pre-enrichment.
    pub ingest_queue: Arc<DropOldestQueue<Record>>,
    /// Enriched records awaiting the bulk writer.
    pub write_queue: Arc<DropOldestQueue<Record>>,
    pub pipeline: Arc<EnrichmentPipeline>,
    pub witness: Arc<CrossCustomerWitness>,
    pub sessions: Arc<SessionRegistry>,
    pub replay_index: Arc<ReplayIndex>,
    pub company_rollup: Arc<CompanyRollup>,
    pub writer: WriterHandle,
    pub started_at: Instant,
}

impl EngineState {
    pub async fn build(config: Arc<EngineConfig>, pool: Option<sqlx::PgPool>) -> Self {
        let ingest_queue = Arc::new(DropOldestQueue::new(config.queue_capacity));
        let write_queue = Arc::new(DropOldestQueue::new(config.queue_capacity));

        let witness = Arc::new(CrossCustomerWitness::new());
        let sessions = Arc::new(SessionRegistry::new());
        let replay_index = Arc::new(ReplayIndex::new());
        let company_rollup = Arc::new(CompanyRollup::new());

        let tier1 = Tier1Context::new(
            config.offline_geo_db_path.as_deref(),
            config.offline_asn_db_path.as_deref(),
            config.online_geo_endpoint.clone(),
            config.online_geo_requests_per_second,
            config.whois_endpoint.clone(),
            Duration::from_secs(config.rdns_timeout_secs),
        );
        let tier2 = Tier2Context::new(witness.clone(), sessions.clone());
        let tier3 = Tier3Context::new(replay_index.clone(), company_rollup.clone());
        let pipeline = Arc::new(EnrichmentPipeline { tier1, tier2, tier3 });

        let writer = writer::build(
            pool,
            write_queue.clone(),
            config.batch_size,
            config.dead_letter_directory.clone(),
        )
        .await;

        Self {
            config,
            ingest_queue,
            write_queue,
            pipeline,
            witness,
            sessions,
            replay_index,
            company_rollup,
            writer,
            started_at: Instant::now(),
        }
    }
}
