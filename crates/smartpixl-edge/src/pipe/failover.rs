//! Failover writer (spec §4.4): bounded drop-oldest queue, single reader,
//! appending one JSON line per record to a UTC-date-named file, flushing
//! on every line, rolling at UTC midnight.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use smartpixl_core::queue::DropOldestQueue;
use smartpixl_core::Record;
use tokio::io::AsyncWriteExt;

pub struct FailoverWriter {
    queue: Arc<DropOldestQueue<Record>>,
    directory: PathBuf,
}

fn file_name_for(date: chrono::NaiveDate) -> String {
    format!("failover_{}.jsonl", date.format("%Y_%m_%d"))
}

impl FailoverWriter {
    pub fn new(directory: PathBuf, capacity: usize) -> Self {
        Self {
            queue: Arc::new(DropOldestQueue::new(capacity)),
            directory,
        }
    }

    /// Hand a record to the failover writer. Never blocks (drop-oldest).
    pub fn enqueue(&self, record: Record) {
        self.queue.push(record);
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Drain every record currently queued directly to disk, for use at
    /// shutdown where the background task may already have exited.
    pub async fn flush_remaining(&self) -> anyhow::Result<usize> {
        let remaining = self.queue.drain();
        let count = remaining.len();
        for record in remaining {
            self.append_line(&record).await?;
        }
        Ok(count)
    }

    async fn append_line(&self, record: &Record) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.directory).await?;
        let path = self.directory.join(file_name_for(Utc::now().date_naive()));
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    /// Spawn the single background reader (spec §5: "single reader, many
    /// producers"). Runs until `shutdown` fires, at which point it drains
    /// whatever remains before returning.
    pub fn spawn(self: Arc<Self>, mut shutdown: tokio::sync::watch::Receiver<bool>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    record = self.queue.pop() => {
                        if let Err(e) = self.append_line(&record).await {
                            tracing::error!(err = %e, "failover writer: dropping record after write failure");
                        }
                    }
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            if let Err(e) = self.flush_remaining().await {
                                tracing::error!(err = %e, "failover writer: error flushing on shutdown");
                            }
                            break;
                        }
                    }
                }
            }
        })
    }
}
