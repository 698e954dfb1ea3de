//! Failover catch-up service (spec §4.5): on engine start-up, and then on
//! a periodic cadence, scans the failover directory for `.jsonl` files and
//! feeds their lines into the same ingest queue the live pipe server
//! writes to. A file is deleted only once every line in it parsed cleanly
//! and was handed to the queue; a parse failure or a trailing partial line
//! (the edge may still be appending) leaves the file for the next cycle.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use smartpixl_core::queue::DropOldestQueue;
use smartpixl_core::Record;

/// Result of draining one file: how many lines were accepted, and whether
/// the file is safe to delete.
struct DrainOutcome {
    accepted: usize,
    clean: bool,
}

fn drain_file_contents(contents: &str, queue: &DropOldestQueue<Record>) -> DrainOutcome {
    let ends_with_newline = contents.ends_with('\n');
    let mut accepted = 0usize;
    let mut clean = ends_with_newline;

    let lines: Vec<&str> = contents.lines().collect();
    for (idx, line) in lines.iter().enumerate() {
        let is_trailing_partial = !ends_with_newline && idx == lines.len() - 1;
        if is_trailing_partial {
            // Edge may still be writing this line; don't touch it.
            continue;
        }
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Record>(line) {
            Ok(record) => {
                queue.push(record);
                accepted += 1;
            }
            Err(e) => {
                tracing::warn!(err = %e, "catch-up: skipping malformed failover line");
                clean = false;
            }
        }
    }
    DrainOutcome { accepted, clean }
}

/// Drain one failover file into `queue`. Returns `true` if the file was
/// fully consumed and deleted.
async fn drain_file(path: &Path, queue: &DropOldestQueue<Record>) -> anyhow::Result<bool> {
    let contents = tokio::fs::read_to_string(path).await?;
    let outcome = drain_file_contents(&contents, queue);
    if outcome.clean {
        tokio::fs::remove_file(path).await?;
        tracing::info!(path = %path.display(), accepted = outcome.accepted, "catch-up: file fully drained, deleted");
    } else if outcome.accepted > 0 {
        tracing::info!(path = %path.display(), accepted = outcome.accepted, "catch-up: partial drain, file retained for next cycle");
    }
    Ok(outcome.clean)
}

/// One sweep of the failover directory: every `*.jsonl` file, oldest
/// filename first (failover filenames are UTC-date-sortable).
pub async fn run_once(directory: &Path, queue: &DropOldestQueue<Record>) -> anyhow::Result<usize> {
    let mut entries = match tokio::fs::read_dir(directory).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut paths: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("jsonl") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut drained = 0usize;
    for path in paths {
        match drain_file(&path, queue).await {
            Ok(true) => drained += 1,
            Ok(false) => {}
            Err(e) => tracing::warn!(path = %path.display(), err = %e, "catch-up: failed to read failover file"),
        }
    }
    Ok(drained)
}

/// Spawn the periodic catch-up worker, after an immediate first pass on
/// start-up (spec §4.5: "on engine start and then on a periodic cadence").
pub fn spawn(
    directory: PathBuf,
    queue: Arc<DropOldestQueue<Record>>,
    interval: std::time::Duration,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = run_once(&directory, &queue).await {
            tracing::warn!(err = %e, "catch-up: initial sweep failed");
        }
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = run_once(&directory, &queue).await {
                        tracing::warn!(err = %e, "catch-up: periodic sweep failed");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_line() -> String {
        let record = Record {
            company_id: "ACME".into(),
            pixel_id: "1".into(),
            remote_address: "203.0.113.9".into(),
            request_path: "/ACME/1_x_SMART.GIF".into(),
            query_string: "sw=1920".into(),
            headers_json: "{}".into(),
            user_agent: "ua".into(),
            referer: "".into(),
            received_at: Utc::now(),
        };
        serde_json::to_string(&record).unwrap()
    }

    #[tokio::test]
    async fn fully_clean_file_is_drained_and_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("failover_2026_07_28.jsonl");
        let contents = format!("{}\n{}\n", sample_line(), sample_line());
        tokio::fs::write(&path, contents).await.unwrap();

        let queue = Arc::new(DropOldestQueue::new(16));
        let drained = run_once(dir.path(), &queue).await.unwrap();
        assert_eq!(drained, 1);
        assert_eq!(queue.len(), 2);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn trailing_partial_line_retains_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("failover_2026_07_28.jsonl");
        let contents = format!("{}\n{{\"company_id\":\"incomple", sample_line());
        tokio::fs::write(&path, contents).await.unwrap();

        let queue = Arc::new(DropOldestQueue::new(16));
        let drained = run_once(dir.path(), &queue).await.unwrap();
        assert_eq!(drained, 0);
        assert_eq!(queue.len(), 1);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn malformed_line_retains_file_but_still_drains_good_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("failover_2026_07_28.jsonl");
        let contents = format!("{}\nnot json at all\n", sample_line());
        tokio::fs::write(&path, contents).await.unwrap();

        let queue = Arc::new(DropOldestQueue::new(16));
        let drained = run_once(dir.path(), &queue).await.unwrap();
        assert_eq!(drained, 0);
        assert_eq!(queue.len(), 1);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn missing_directory_yields_zero_drained() {
        let queue = Arc::new(DropOldestQueue::new(16));
        let drained = run_once(Path::new("/nonexistent/failover/dir"), &queue).await.unwrap();
        assert_eq!(drained, 0);
    }
}
