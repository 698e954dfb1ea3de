//! The bulk writer subsystem (spec §4.7): circuit breaker, dead-letter
//! store, and the batching writer itself, wired together behind one
//! `spawn` call `main.rs` invokes once.

pub mod bulk;
pub mod circuit;
pub mod deadletter;

use std::sync::Arc;
use std::time::Duration;

use smartpixl_core::queue::DropOldestQueue;
use smartpixl_core::Record;

pub use bulk::BulkWriter;
pub use circuit::{CircuitBreaker, CircuitState};
pub use deadletter::DeadLetterStore;

/// Everything the bulk writer needs, bundled so `main.rs` can hand it one
/// object to the pipeline, the internal HTTP endpoint, and the shutdown
/// sequence alike.
pub struct WriterHandle {
    pub writer: Arc<BulkWriter>,
    pub circuit: Arc<CircuitBreaker>,
}

/// Build the writer stack and kick off dead-letter replay before the
/// caller starts feeding it fresh records. `pool` is `None` when
/// `connection_string` is unset, in which case every batch is
/// dead-lettered immediately rather than panicking — a misconfigured
/// store degrades to "everything queued for later", not a crash loop.
pub async fn build(
    pool: Option<sqlx::PgPool>,
    queue: Arc<DropOldestQueue<Record>>,
    batch_size: usize,
    dead_letter_directory: std::path::PathBuf,
) -> WriterHandle {
    let circuit = Arc::new(CircuitBreaker::new());
    let dead_letters = Arc::new(DeadLetterStore::new(dead_letter_directory));
    let writer = Arc::new(BulkWriter::new(pool, queue, batch_size, circuit.clone(), dead_letters));

    match writer.replay_dead_letters().await {
        Ok(0) => {}
        Ok(n) => tracing::info!(records = n, "bulk writer: replayed dead-lettered records at startup"),
        Err(e) => tracing::warn!(err = %e, "bulk writer: dead-letter replay sweep failed at startup"),
    }

    WriterHandle { writer, circuit }
}

impl WriterHandle {
    pub async fn spawn(
        &self,
        shutdown: tokio::sync::watch::Receiver<bool>,
        shutdown_timeout: Duration,
    ) -> tokio::task::JoinHandle<()> {
        self.writer.clone().spawn(shutdown, shutdown_timeout).await
    }
}
