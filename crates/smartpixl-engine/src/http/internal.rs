//! Internal HTTP endpoints (spec §4.7, §6.3): `/internal/health` reports
//! queue depths and circuit state; `/internal/circuit-reset` is the
//! operator override that actually owns the circuit breaker this time
//! (the edge's own `/internal/circuit-reset` is a pass-through stub —
//! this is where the reset lands). Both are gated by [`super::is_same_host`]
//! and return 404 rather than 403 on denial.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use super::is_same_host;
use crate::EngineState;

pub fn router(state: Arc<EngineState>) -> Router {
    Router::new()
        .route("/internal/health", get(health))
        .route("/internal/circuit-reset", post(circuit_reset))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<Arc<EngineState>>, ConnectInfo(remote): ConnectInfo<SocketAddr>) -> Response {
    if !is_same_host(remote.ip(), &state.config.dashboard_allowed_ips) {
        return StatusCode::NOT_FOUND.into_response();
    }
    let body = serde_json::json!({
        "ingestQueueDepth": state.ingest_queue.len(),
        "writeQueueDepth": state.write_queue.len(),
        "circuitState": format!("{:?}", state.writer.circuit.state()),
        "circuitConsecutiveFailures": state.writer.circuit.consecutive_failures(),
        "uptimeSecs": state.started_at.elapsed().as_secs(),
    });
    axum::Json(body).into_response()
}

async fn circuit_reset(State(state): State<Arc<EngineState>>, ConnectInfo(remote): ConnectInfo<SocketAddr>) -> Response {
    if !is_same_host(remote.ip(), &state.config.dashboard_allowed_ips) {
        return StatusCode::NOT_FOUND.into_response();
    }
    state.writer.circuit.force_closed();
    tracing::info!("circuit breaker force-closed via /internal/circuit-reset");
    axum::Json(serde_json::json!({ "ok": true })).into_response()
}
