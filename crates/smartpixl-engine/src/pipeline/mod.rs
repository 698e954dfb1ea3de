//! The enrichment pipeline (spec §4.6): one consumer of the shared ingest
//! queue, sequential tiered analyzers each appending `_srv_*` pairs, one
//! producer into the bulk-writer queue. Tiers run in order 1→2→3; within a
//! tier, analyzer order is not an observable contract (spec §5), though
//! this implementation runs them in the order §4.6 lists them.
//!
//! A failing analyzer is logged and skipped, never aborts the record —
//! every `analyze` function here is infallible by construction (no analyzer
//! returns a `Result`; failure paths resolve internally to "no pairs").

pub mod tier1;
pub mod tier2;
pub mod tier3;

use std::net::IpAddr;

use chrono::Utc;
use smartpixl_core::qs::{append_pairs, parse_query_params};
use smartpixl_core::Record;

pub struct EnrichmentPipeline {
    pub tier1: tier1::Tier1Context,
    pub tier2: tier2::Tier2Context,
    pub tier3: tier3::Tier3Context,
}

impl EnrichmentPipeline {
    /// Run every tier over `record`, returning a new record with every
    /// fired `_srv_*` pair appended to its query string (spec §3.1: "all
    /// enrichment output rides inside QueryString").
    pub async fn process(&self, record: &Record) -> Record {
        let params = parse_query_params(&record.query_string);
        let ip: Option<IpAddr> = record.remote_address.parse().ok();
        let now = Utc::now();
        let mut pairs: Vec<(&'static str, String)> = Vec::new();

        self.tier1.run(&record.user_agent, ip, &mut pairs).await;
        self.tier2.run(
            ip,
            &record.company_id,
            &record.request_path,
            &record.user_agent,
            &params,
            now,
            &mut pairs,
        );
        self.tier3.run(&record.company_id, &params, now, &mut pairs);

        if pairs.is_empty() {
            record.clone()
        } else {
            record.with_query_string(append_pairs(&record.query_string, &pairs))
        }
    }
}

/// Spawn the single pipeline consumer (spec §4.6: one consumer of the
/// ingest queue feeding one producer into the write queue). Runs until
/// `shutdown` fires, then drains whatever remains in `ingest` so no
/// received-but-unenriched record is silently dropped.
pub fn spawn_consumer(
    pipeline: std::sync::Arc<EnrichmentPipeline>,
    ingest: std::sync::Arc<smartpixl_core::queue::DropOldestQueue<Record>>,
    write_queue: std::sync::Arc<smartpixl_core::queue::DropOldestQueue<Record>>,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                record = ingest.pop() => {
                    let enriched = pipeline.process(&record).await;
                    write_queue.push(enriched);
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        for record in ingest.drain() {
            let enriched = pipeline.process(&record).await;
            write_queue.push(enriched);
        }
    })
}
