//! Axum router wiring the fixed URL-shape dispatch table (spec §4.1).
//!
//! Every route either returns the 43-byte transparent GIF (possibly after
//! capturing + enqueuing a record) or the generated fingerprint script; the
//! two internal endpoints are gated by [`super::is_same_host`] and return
//! 404 rather than 403 on denial so their existence is never disclosed.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{ConnectInfo, OriginalUri, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use tower_http::trace::TraceLayer;
use smartpixl_core::gif::{
    CACHE_CONTROL_NO_CACHE, EXPIRES_ZERO, GIF_CONTENT_TYPE, JS_CONTENT_TYPE, PRAGMA_NO_CACHE,
    TRANSPARENT_GIF, X_CONTENT_TYPE_OPTIONS_NOSNIFF,
};
use smartpixl_core::record::is_valid_identifier;

use super::capture::{build_record, parse_pixel_path, PixelKind};
use super::script_cache::build_gif_url;
use super::is_same_host;
use crate::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/internal/health", get(health))
        .route("/internal/circuit-reset", get(circuit_reset))
        .fallback(get(pixel_or_trap))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn no_cache_headers(content_type: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, content_type.parse().unwrap());
    headers.insert(header::CACHE_CONTROL, CACHE_CONTROL_NO_CACHE.parse().unwrap());
    headers.insert(header::PRAGMA, PRAGMA_NO_CACHE.parse().unwrap());
    headers.insert(header::EXPIRES, EXPIRES_ZERO.parse().unwrap());
    headers
}

fn gif_response() -> Response {
    (StatusCode::OK, no_cache_headers(GIF_CONTENT_TYPE), TRANSPARENT_GIF.to_vec()).into_response()
}

/// The catch-all route: matches both recognized pixel shapes (`.GIF`/`.js`)
/// and bot-trap requests (anything else, spec §4.1's last row). Handling
/// both in one handler mirrors the spec's routing table, which treats
/// "pixel or bot trap" as a single fallthrough branch.
async fn pixel_or_trap(
    State(state): State<Arc<AppState>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Response {
    let start = Instant::now();
    let path = uri.path();
    let query = uri.query().unwrap_or("");
    let remote_ip = remote.ip();
    let now = Utc::now();

    let parsed = parse_pixel_path(path);

    match parsed {
        Some(pixel_path) => {
            let ids_valid = is_valid_identifier(&pixel_path.company) && is_valid_identifier(&pixel_path.pixel);

            if pixel_path.kind == PixelKind::Js {
                if !ids_valid {
                    return (StatusCode::BAD_REQUEST, "invalid identifier").into_response();
                }
                let gif_url = build_gif_url(&state.config.base_url, &pixel_path.company, &pixel_path.pixel, &pixel_path.domain);
                let body = state.script_cache.render(&gif_url);
                let mut resp_headers = no_cache_headers(JS_CONTENT_TYPE);
                resp_headers.insert(
                    header::X_CONTENT_TYPE_OPTIONS,
                    X_CONTENT_TYPE_OPTIONS_NOSNIFF.parse().unwrap(),
                );
                return (StatusCode::OK, resp_headers, body.to_string()).into_response();
            }

            // `.GIF` shape: invalid identifiers are still captured, just
            // marked as a bot trap (spec §4.1: "never reveal validity").
            let record = build_record(
                &pixel_path.company,
                &pixel_path.pixel,
                remote_ip,
                path,
                query,
                &headers,
                now,
            );
            let bot_trap = !ids_valid;
            capture_and_enqueue(&state, record, now, bot_trap);
            record_latency(start);
            gif_response()
        }
        None => {
            // No recognized shape at all (spec §4.1 last row): still a GIF,
            // always flagged as a bot trap.
            let record = build_record("", "", remote_ip, path, query, &headers, now);
            capture_and_enqueue(&state, record, now, true);
            record_latency(start);
            gif_response()
        }
    }
}

fn capture_and_enqueue(state: &Arc<AppState>, record: smartpixl_core::Record, now: chrono::DateTime<Utc>, bot_trap: bool) {
    let enriched = state.enrichment_bank.enrich(&record, now, bot_trap);
    state.pipe_client.try_enqueue(enriched);
}

/// Pixel-response latency budget check (spec §8.1: "no synchronous I/O on
/// the GIF response path"). Logged rather than enforced — a hard abort here
/// would itself be synchronous I/O-adjacent policy the spec doesn't ask for.
fn record_latency(start: Instant) {
    let elapsed = start.elapsed();
    if elapsed > std::time::Duration::from_millis(10) {
        tracing::warn!(elapsed_ms = elapsed.as_millis() as u64, "pixel response exceeded latency budget");
    }
}

async fn health(
    State(state): State<Arc<AppState>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
) -> Response {
    if !is_same_host(remote.ip(), &state.config.dashboard_allowed_ips) {
        return StatusCode::NOT_FOUND.into_response();
    }
    let body = serde_json::json!({
        "pipeConnected": state.pipe_client.queue_len() < state.config.queue_capacity,
        "queueDepth": state.pipe_client.queue_len(),
        "failoverQueueDepth": state.failover_writer.queue_len(),
        "uptimeSecs": state.started_at.elapsed().as_secs(),
    });
    axum::Json(body).into_response()
}

async fn circuit_reset(
    State(state): State<Arc<AppState>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
) -> Response {
    if !is_same_host(remote.ip(), &state.config.dashboard_allowed_ips) {
        return StatusCode::NOT_FOUND.into_response();
    }
    // The edge doesn't own the circuit breaker (that's engine-side, §4.7);
    // this endpoint just acks so the operator's reset call has one place to
    // hit regardless of which process fronts it.
    axum::Json(serde_json::json!({ "ok": true })).into_response()
}
