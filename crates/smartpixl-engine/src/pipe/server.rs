//! Pipe server (spec §4.5): accepts multiple concurrent same-host duplex
//! connections, each a reader task producing into a shared bounded ingest
//! queue. Malformed lines are logged and skipped — they never take down
//! the connection, and a disconnecting client never stops the accept loop.
//!
//! Grounded in the teacher's WebSocket accept loop
//! (`daemon/src/ipc/mod.rs::handle_connection`): peel one connection off the
//! listener, spawn a task per connection, keep accepting.

use std::path::PathBuf;
use std::sync::Arc;

use smartpixl_core::queue::DropOldestQueue;
use smartpixl_core::wire::{read_frame, WireError, WireMessage};
use smartpixl_core::Record;
use tokio::io::BufReader;
use tokio::net::{UnixListener, UnixStream};

/// Spawn the accept loop. Binds `socket_path` (removing a stale socket
/// file first, the standard Unix-domain-socket restart dance), then loops
/// accepting connections until `shutdown` fires.
pub fn spawn_accept_loop(
    socket_path: PathBuf,
    queue: Arc<DropOldestQueue<Record>>,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) -> tokio::task::JoinHandle<anyhow::Result<()>> {
    tokio::spawn(async move {
        if socket_path.exists() {
            std::fs::remove_file(&socket_path)?;
        }
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let listener = UnixListener::bind(&socket_path)?;
        tracing::info!(path = %socket_path.display(), "pipe server listening");

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, _addr)) => {
                            let queue = queue.clone();
                            let conn_shutdown = shutdown.clone();
                            tokio::spawn(handle_connection(stream, queue, conn_shutdown));
                        }
                        Err(e) => {
                            tracing::warn!(err = %e, "pipe server: accept failed");
                        }
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        Ok(())
    })
}

/// One reader task per connection (spec §5: "one accept loop and one
/// reader task per active connection; they feed a single bounded queue
/// with many producers"). Returns (and the task ends) on client
/// disconnect or a transport error — the server keeps accepting others.
async fn handle_connection(
    stream: UnixStream,
    queue: Arc<DropOldestQueue<Record>>,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    let mut reader = BufReader::new(stream);
    let mut edge_id = String::from("unknown");
    loop {
        tokio::select! {
            frame = read_frame(&mut reader) => {
                match frame {
                    Ok(WireMessage::Hello { edge_id: id }) => {
                        edge_id = id;
                        tracing::info!(edge_id = %edge_id, "pipe server: edge connected");
                    }
                    Ok(WireMessage::Data { record, .. }) => {
                        queue.push(record);
                    }
                    Ok(WireMessage::Ack { .. }) => {
                        // The engine never expects an ack from the edge on this
                        // half of the stream; ignore rather than treat as an error.
                    }
                    Err(WireError::Closed) => {
                        tracing::info!(edge_id = %edge_id, "pipe server: edge disconnected");
                        return;
                    }
                    Err(WireError::Json(e)) => {
                        // One malformed line never drops the whole connection
                        // (spec §4.5).
                        tracing::warn!(edge_id = %edge_id, err = %e, "pipe server: skipping malformed line");
                    }
                    Err(WireError::Io(e)) => {
                        tracing::warn!(edge_id = %edge_id, err = %e, "pipe server: io error, closing connection");
                        return;
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use smartpixl_core::wire::write_frame;

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

    #[tokio::test]
    async fn accept_loop_feeds_queue_from_connecting_client() {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("engine.sock");
        let queue = Arc::new(DropOldestQueue::new(16));
        let (tx, rx) = tokio::sync::watch::channel(false);
        let handle = spawn_accept_loop(socket_path.clone(), queue.clone(), rx);

        // Give the listener a moment to bind.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let mut client = UnixStream::connect(&socket_path).await.unwrap();
        write_frame(&mut client, &WireMessage::Hello { edge_id: "edge-1".into() })
            .await
            .unwrap();
        write_frame(&mut client, &WireMessage::Data { seq: 1, record: sample_record() })
            .await
            .unwrap();

        tokio::time::timeout(std::time::Duration::from_secs(1), async {
            loop {
                if queue.len() == 1 {
                    break;
                }
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(queue.len(), 1);
        tx.send(true).unwrap();
        let _ = tokio::time::timeout(std::time::Duration::from_secs(1), handle).await;
    }
}
