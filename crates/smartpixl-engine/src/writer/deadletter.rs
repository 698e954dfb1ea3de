//! Dead-letter store (spec §4.7, §6.2): a batch the bulk writer could not
//! place after exhausting retries (or that arrived while the circuit was
//! open) is serialized whole to
//! `deadletter_<UTC-timestamp>_<uniqueid>.json` so it survives a process
//! restart. At startup every file in the directory is reloaded oldest
//! first and handed back to the writer for another attempt.
//!
//! Grounded in `smartpixl-edge`'s [`crate::pipe::failover::FailoverWriter`]
//! for the append-and-flush file idiom, generalized from one-line-per-record
//! to one-file-per-batch since a dead-lettered batch must be replayed as a
//! unit (spec §4.7: "a partially replayed batch is not a valid outcome").

use std::path::{Path, PathBuf};

use chrono::Utc;
use smartpixl_core::Record;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

pub struct DeadLetterStore {
    directory: PathBuf,
}

fn file_name_for(now: chrono::DateTime<Utc>, unique_id: Uuid) -> String {
    format!("deadletter_{}_{}.json", now.format("%Y%m%dT%H%M%S%.3f"), unique_id)
}

impl DeadLetterStore {
    pub fn new(directory: PathBuf) -> Self {
        Self { directory }
    }

    /// Write `batch` to a new dead-letter file. Empty batches are skipped.
    pub async fn write_batch(&self, batch: &[Record]) -> anyhow::Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        tokio::fs::create_dir_all(&self.directory).await?;
        let path = self.directory.join(file_name_for(Utc::now(), Uuid::new_v4()));
        let body = serde_json::to_vec_pretty(batch)?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .await?;
        file.write_all(&body).await?;
        file.flush().await?;
        tracing::warn!(path = %path.display(), records = batch.len(), "dead-lettered batch");
        Ok(())
    }

    /// Load every dead-letter file currently on disk, oldest filename
    /// first (the timestamp-prefixed name sorts chronologically), without
    /// removing anything — callers remove a file only after a successful
    /// replay via [`DeadLetterStore::remove`].
    pub async fn load_pending(&self) -> anyhow::Result<Vec<(PathBuf, Vec<Record>)>> {
        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut out = Vec::with_capacity(paths.len());
        for path in paths {
            let body = tokio::fs::read(&path).await?;
            match serde_json::from_slice::<Vec<Record>>(&body) {
                Ok(batch) => out.push((path, batch)),
                Err(e) => {
                    tracing::error!(path = %path.display(), err = %e, "unreadable dead-letter file, leaving in place");
                }
            }
        }
        Ok(out)
    }

    pub async fn remove(&self, path: &Path) -> anyhow::Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> Record {
        Record {
            company_id: "ACME".into(),
            pixel_id: "1".into(),
            remote_address: "203.0.113.9".into(),
            request_path: "/ACME/1_x_SMART.GIF".into(),
            query_string: "sw=1920".into(),
            headers_json: "{}".into(),
            user_agent: "ua".into(),
            referer: "".into(),
            received_at: Utc::now(),
        }
    }

    #[test]
    fn file_name_is_timestamp_then_uuid() {
        let now: chrono::DateTime<Utc> = "2026-07-28T12:00:00.500Z".parse().unwrap();
        let id = Uuid::nil();
        let name = file_name_for(now, id);
        assert!(name.starts_with("deadletter_20260728T120000.500_"));
        assert!(name.ends_with(".json"));
    }

    #[tokio::test]
    async fn empty_batch_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = DeadLetterStore::new(dir.path().to_path_buf());
        store.write_batch(&[]).await.unwrap();
        assert!(!dir.path().exists() || std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn write_then_load_round_trips_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let store = DeadLetterStore::new(dir.path().to_path_buf());
        let batch = vec![sample_record(), sample_record()];
        store.write_batch(&batch).await.unwrap();

        let pending = store.load_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].1.len(), 2);
    }

    #[tokio::test]
    async fn load_pending_returns_oldest_file_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = DeadLetterStore::new(dir.path().to_path_buf());

        tokio::fs::create_dir_all(dir.path()).await.unwrap();
        tokio::fs::write(dir.path().join("deadletter_20260101T000000.000_a.json"), b"[]").await.unwrap();
        tokio::fs::write(dir.path().join("deadletter_20260102T000000.000_b.json"), b"[]").await.unwrap();

        let pending = store.load_pending().await.unwrap();
        assert_eq!(pending.len(), 2);
        assert!(pending[0].0.to_string_lossy().contains("20260101"));
        assert!(pending[1].0.to_string_lossy().contains("20260102"));
    }

    #[tokio::test]
    async fn remove_deletes_the_file_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = DeadLetterStore::new(dir.path().to_path_buf());
        store.write_batch(&[sample_record()]).await.unwrap();
        let pending = store.load_pending().await.unwrap();
        let path = pending[0].0.clone();

        store.remove(&path).await.unwrap();
        assert!(!path.exists());
        store.remove(&path).await.unwrap();
    }

    #[tokio::test]
    async fn missing_directory_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let store = DeadLetterStore::new(missing);
        let pending = store.load_pending().await.unwrap();
        assert!(pending.is_empty());
    }
}
