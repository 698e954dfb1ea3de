//! Newline-delimited JSON framing for the edge <-> engine duplex stream
//! (spec §6.1 "same-host duplex stream", §4.4 pipe client / §4.6 pipe
//! server). One [`Record`] per line, one envelope type for acks so the
//! same framing carries both directions.
//!
//! Grounded in the teacher's WebSocket JSON-RPC framing
//! (`daemon/src/ipc/mod.rs`): line-delimited `serde_json` messages over an
//! async read/write half, with a typed envelope instead of ad hoc strings.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::record::Record;

/// Every message on the wire is one of these. `Hello` is sent once by the
/// edge on connect so the engine can log which edge instance attached;
/// `Ack` carries back the highest `seq` durably accepted so the sender can
/// trim its own retry buffer (spec §4.4: "at-least-once delivery").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireMessage {
    Hello { edge_id: String },
    Data { seq: u64, record: Record },
    Ack { seq: u64 },
}

/// Errors from reading or writing one frame.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("io error on wire stream: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed json frame: {0}")]
    Json(#[from] serde_json::Error),
    #[error("peer closed the stream")]
    Closed,
}

/// Serialize one message as a single JSON line (no embedded newlines,
/// `serde_json` never emits raw `\n` inside a compact object) and write it
/// followed by `\n`.
pub async fn write_frame<W>(writer: &mut W, message: &WireMessage) -> Result<(), WireError>
where
    W: AsyncWriteExt + Unpin,
{
    let mut line = serde_json::to_vec(message)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one JSON line from `reader` into a [`WireMessage`]. Returns
/// `Err(WireError::Closed)` on clean EOF so callers can distinguish "peer
/// hung up" from "peer sent garbage".
pub async fn read_frame<R>(reader: &mut BufReader<R>) -> Result<WireMessage, WireError>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut line = String::new();
    let n = reader.read_line(&mut line).await?;
    if n == 0 {
        return Err(WireError::Closed);
    }
    let message = serde_json::from_str(line.trim_end())?;
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tokio::io::{duplex, BufReader as TokioBufReader};

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
    async fn round_trips_data_frame() {
        let (mut client, server) = duplex(4096);
        let msg = WireMessage::Data {
            seq: 7,
            record: sample_record(),
        };
        write_frame(&mut client, &msg).await.unwrap();

        let mut reader = TokioBufReader::new(server);
        let got = read_frame(&mut reader).await.unwrap();
        match got {
            WireMessage::Data { seq, record } => {
                assert_eq!(seq, 7);
                assert_eq!(record.company_id, "ACME");
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[tokio::test]
    async fn clean_close_yields_closed_error() {
        let (client, server) = duplex(4096);
        drop(client);
        let mut reader = TokioBufReader::new(server);
        let err = read_frame(&mut reader).await.unwrap_err();
        assert!(matches!(err, WireError::Closed));
    }

    #[tokio::test]
    async fn hello_and_ack_round_trip() {
        let (mut client, server) = duplex(4096);
        write_frame(&mut client, &WireMessage::Hello { edge_id: "edge-1".into() })
            .await
            .unwrap();
        write_frame(&mut client, &WireMessage::Ack { seq: 42 }).await.unwrap();

        let mut reader = TokioBufReader::new(server);
        assert!(matches!(
            read_frame(&mut reader).await.unwrap(),
            WireMessage::Hello { edge_id } if edge_id == "edge-1"
        ));
        assert!(matches!(
            read_frame(&mut reader).await.unwrap(),
            WireMessage::Ack { seq: 42 }
        ));
    }
}
