//! Bulk writer (spec §4.7): the engine's single consumer of the
//! post-enrichment queue. Batches up to `batch_size` records and writes
//! them to Postgres in one round trip via [`sqlx::QueryBuilder`]'s
//! `push_values`, reading each record column-by-column through
//! [`Record::column_at`] rather than building an intermediate row type —
//! the closest idiomatic analogue this stack has to the original's
//! streaming bulk-copy reader (SPEC_FULL.md §4.7).
//!
//! Error classification on a failed batch (spec §4.7):
//! - insufficient-resources class (`53xxx`, e.g. disk/log full) trips the
//!   circuit breaker immediately and dead-letters the batch without retry.
//! - deadlock (`40P01`) retries up to [`MAX_RETRIES`] times with the fixed
//!   1s/2s/4s backoff, then dead-letters.
//! - anything else follows the same bounded retry before dead-lettering.
//!
//! Grounded in the teacher's `arena/storage.rs` for the `sqlx::query*` /
//! `Pool` idiom, generalized from SQLite to Postgres and from row-at-a-time
//! to a `QueryBuilder`-driven batch insert.

use std::sync::Arc;
use std::time::Duration;

use smartpixl_core::queue::DropOldestQueue;
use smartpixl_core::record::COLUMN_NAMES;
use smartpixl_core::Record;
use sqlx::PgPool;

use super::circuit::CircuitBreaker;
use super::deadletter::DeadLetterStore;

const MAX_RETRIES: u32 = 3;
const RETRY_BACKOFFS_SECS: [u64; MAX_RETRIES as usize] = [1, 2, 4];
const TABLE_NAME: &str = "pixel_hits";

/// Outcome of classifying a failed batch write, deciding the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureClass {
    /// Insufficient resources at the store (disk/log full, out of memory):
    /// retrying would just fail again immediately.
    Fatal,
    /// Transient contention (deadlock): worth retrying.
    Retryable,
}

fn classify(error: &sqlx::Error) -> FailureClass {
    if let sqlx::Error::Database(db_err) = error {
        if let Some(code) = db_err.code() {
            let code = code.as_ref();
            if code == "40P01" {
                return FailureClass::Retryable;
            }
            if code.starts_with("53") {
                return FailureClass::Fatal;
            }
        }
    }
    FailureClass::Retryable
}

pub struct BulkWriter {
    pool: Option<PgPool>,
    queue: Arc<DropOldestQueue<Record>>,
    batch_size: usize,
    circuit: Arc<CircuitBreaker>,
    dead_letters: Arc<DeadLetterStore>,
}

impl BulkWriter {
    pub fn new(
        pool: Option<PgPool>,
        queue: Arc<DropOldestQueue<Record>>,
        batch_size: usize,
        circuit: Arc<CircuitBreaker>,
        dead_letters: Arc<DeadLetterStore>,
    ) -> Self {
        Self { pool, queue, batch_size, circuit, dead_letters }
    }

    /// Replay every dead-lettered batch on disk, oldest first, before the
    /// writer starts consuming fresh records (spec §6.2).
    pub async fn replay_dead_letters(&self) -> anyhow::Result<usize> {
        let pending = self.dead_letters.load_pending().await?;
        let mut replayed = 0;
        for (path, batch) in pending {
            if self.write_batch_with_retry(&batch).await {
                self.dead_letters.remove(&path).await?;
                replayed += batch.len();
            } else {
                tracing::warn!(path = %path.display(), "bulk writer: dead-letter replay still failing, leaving file in place");
            }
        }
        Ok(replayed)
    }

    async fn insert_batch(&self, batch: &[Record]) -> Result<(), sqlx::Error> {
        let Some(pool) = &self.pool else {
            return Err(sqlx::Error::Configuration("no database pool configured".into()));
        };
        if batch.is_empty() {
            return Ok(());
        }

        let columns = COLUMN_NAMES.join(", ");
        let mut builder = sqlx::QueryBuilder::new(format!("INSERT INTO {TABLE_NAME} ({columns}) "));
        builder.push_values(batch, |mut row, record| {
            for idx in 0..COLUMN_NAMES.len() {
                row.push_bind(record.column_at(idx).into_owned());
            }
        });

        builder.build().execute(pool).await?;
        Ok(())
    }

    /// Attempt one batch, honoring the circuit breaker and retry/backoff
    /// policy. Returns whether the batch ultimately landed.
    async fn write_batch_with_retry(&self, batch: &[Record]) -> bool {
        if batch.is_empty() {
            return true;
        }
        if !self.circuit.should_attempt() {
            return false;
        }

        let mut attempt = 0;
        loop {
            match self.insert_batch(batch).await {
                Ok(()) => {
                    self.circuit.record_success();
                    return true;
                }
                Err(e) => {
                    let class = classify(&e);
                    tracing::error!(err = %e, attempt, records = batch.len(), "bulk writer: batch insert failed");
                    if class == FailureClass::Fatal {
                        self.circuit.trip_immediately();
                        return false;
                    }
                    self.circuit.record_failure();
                    if attempt >= MAX_RETRIES {
                        return false;
                    }
                    tokio::time::sleep(Duration::from_secs(RETRY_BACKOFFS_SECS[attempt as usize])).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Write `batch`, dead-lettering it on ultimate failure.
    async fn write_or_dead_letter(&self, batch: &[Record]) {
        if batch.is_empty() {
            return;
        }
        if !self.write_batch_with_retry(batch).await {
            if let Err(e) = self.dead_letters.write_batch(batch).await {
                tracing::error!(err = %e, records = batch.len(), "bulk writer: failed to dead-letter batch, records lost");
            }
        }
    }

    /// Drain up to `batch_size` records off the queue, blocking for the
    /// first one and then draining whatever else is immediately available.
    async fn next_batch(&self) -> Vec<Record> {
        let first = self.queue.pop().await;
        let mut batch = Vec::with_capacity(self.batch_size);
        batch.push(first);
        while batch.len() < self.batch_size {
            match self.queue.try_pop() {
                Some(record) => batch.push(record),
                None => break,
            }
        }
        batch
    }

    /// Run the consumer loop until `shutdown` fires, then drain whatever
    /// remains in the queue (bounded by `shutdown_timeout`) before
    /// returning, dead-lettering anything left past the deadline (spec
    /// §4.7: "no record is silently lost on shutdown").
    pub async fn spawn(
        self: Arc<Self>,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
        shutdown_timeout: Duration,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    batch = self.next_batch() => {
                        self.write_or_dead_letter(&batch).await;
                    }
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            let drain = async {
                loop {
                    let remaining = self.queue.drain();
                    if remaining.is_empty() {
                        break;
                    }
                    for batch in remaining.chunks(self.batch_size) {
                        self.write_or_dead_letter(batch).await;
                    }
                }
            };
            if tokio::time::timeout(shutdown_timeout, drain).await.is_err() {
                let leftover = self.queue.drain();
                if !leftover.is_empty() {
                    tracing::warn!(records = leftover.len(), "bulk writer: shutdown deadline hit, dead-lettering remainder");
                    if let Err(e) = self.dead_letters.write_batch(&leftover).await {
                        tracing::error!(err = %e, "bulk writer: failed to dead-letter shutdown remainder");
                    }
                }
            }
        })
    }
}
