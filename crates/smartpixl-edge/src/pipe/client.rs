//! Pipe client (spec §4.3): a non-blocking enqueue backed by a bounded
//! drop-oldest queue, drained by a single background task that writes to
//! the same-host duplex stream (a Unix domain socket, per `SPEC_FULL.md`
//! §2) with bounded reconnect backoff, falling back to the failover writer
//! whenever the stream is unreachable.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use smartpixl_core::queue::DropOldestQueue;
use smartpixl_core::wire::{write_frame, WireMessage};
use smartpixl_core::Record;
use tokio::net::UnixStream;

use super::failover::FailoverWriter;

const BACKOFF_SEQUENCE_SECS: [u64; 6] = [1, 2, 4, 8, 16, 30];
const CONNECT_TIMEOUT_SECS: u64 = 3;

/// Given the current backoff step index, the delay to wait before the next
/// connect attempt, and the next step index (capped at the last entry).
fn backoff_for(step: usize) -> (u64, usize) {
    let idx = step.min(BACKOFF_SEQUENCE_SECS.len() - 1);
    (BACKOFF_SEQUENCE_SECS[idx], idx + 1)
}

pub struct PipeClient {
    queue: Arc<DropOldestQueue<Record>>,
    failover: Arc<FailoverWriter>,
    socket_path: PathBuf,
    edge_id: String,
    next_seq: AtomicU64,
}

impl PipeClient {
    pub fn new(capacity: usize, socket_path: PathBuf, edge_id: String, failover: Arc<FailoverWriter>) -> Self {
        Self {
            queue: Arc::new(DropOldestQueue::new(capacity)),
            failover,
            socket_path,
            edge_id,
            next_seq: AtomicU64::new(1),
        }
    }

    /// `TryEnqueue(record) -> bool` (spec §4.3): with drop-oldest full-mode
    /// this always reports success.
    pub fn try_enqueue(&self, record: Record) -> bool {
        self.queue.push(record);
        true
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn dropped_count(&self) -> u64 {
        self.queue.dropped_count()
    }

    /// Spawn the single background reader/writer task (spec §5: the pipe
    /// client's background reader is a single long-lived task and the sole
    /// reader of its queue).
    pub fn spawn(self: Arc<Self>, mut shutdown: tokio::sync::watch::Receiver<bool>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut backoff_step = 0usize;
            loop {
                if *shutdown.borrow() {
                    self.drain_to_failover().await;
                    break;
                }

                match tokio::time::timeout(
                    std::time::Duration::from_secs(CONNECT_TIMEOUT_SECS),
                    UnixStream::connect(&self.socket_path),
                )
                .await
                {
                    Ok(Ok(stream)) => {
                        backoff_step = 0;
                        self.drive_connection(stream, &mut shutdown).await;
                    }
                    _ => {
                        let (delay, next_step) = backoff_for(backoff_step);
                        backoff_step = next_step;
                        tracing::warn!(delay, "pipe client: engine unreachable, falling back to failover");
                        self.drain_queue_to_failover();
                        tokio::select! {
                            _ = tokio::time::sleep(std::time::Duration::from_secs(delay)) => {}
                            _ = shutdown.changed() => {}
                        }
                    }
                }
            }
        })
    }

    /// Stream records from the queue to `stream` until a write fails, the
    /// connection drops, or shutdown is signaled. On any break, whatever was
    /// popped-but-not-yet-sent (and everything still queued) has already
    /// gone to either the stream or the failover writer — nothing is lost.
    async fn drive_connection(
        &self,
        stream: UnixStream,
        shutdown: &mut tokio::sync::watch::Receiver<bool>,
    ) {
        let mut stream = stream;
        if write_frame(&mut stream, &WireMessage::Hello { edge_id: self.edge_id.clone() })
            .await
            .is_err()
        {
            return;
        }

        loop {
            tokio::select! {
                record = self.queue.pop() => {
                    let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                    let message = WireMessage::Data { seq, record: record.clone() };
                    if write_frame(&mut stream, &message).await.is_err() {
                        tracing::warn!("pipe client: write failed, rerouting record to failover");
                        self.failover.enqueue(record);
                        return;
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        self.drain_to_failover().await;
                        return;
                    }
                }
            }
        }
    }

    fn drain_queue_to_failover(&self) {
        while let Some(record) = self.queue.try_pop() {
            self.failover.enqueue(record);
        }
    }

    async fn drain_to_failover(&self) {
        self.drain_queue_to_failover();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_sequence_matches_spec() {
        let mut step = 0;
        let mut delays = Vec::new();
        for _ in 0..8 {
            let (delay, next) = backoff_for(step);
            delays.push(delay);
            step = next;
        }
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30, 30]);
    }

    #[tokio::test]
    async fn try_enqueue_always_returns_true_even_when_full() {
        let dir = tempfile::tempdir().unwrap();
        let failover = Arc::new(FailoverWriter::new(dir.path().to_path_buf(), 16));
        let client = PipeClient::new(1, PathBuf::from("/nonexistent.sock"), "edge-1".into(), failover);

        let record = Record {
            company_id: "ACME".into(),
            pixel_id: "1".into(),
            remote_address: "203.0.113.9".into(),
            request_path: "/ACME/1_x_SMART.GIF".into(),
            query_string: "".into(),
            headers_json: "{}".into(),
            user_agent: "ua".into(),
            referer: "".into(),
            received_at: chrono::Utc::now(),
        };
        assert!(client.try_enqueue(record.clone()));
        assert!(client.try_enqueue(record.clone()));
        assert_eq!(client.queue_len(), 1);
        assert_eq!(client.dropped_count(), 1);
    }
}
