//! Session stitcher (spec §4.6 tier 2): wraps
//! [`crate::state::session::SessionRegistry`], deriving the composite
//! device hash from the script-collected fingerprint fields plus the
//! user agent (spec §3.3 glossary: "keyed by composite device hash").

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::state::session::SessionRegistry;

pub fn device_hash(params: &HashMap<String, String>, user_agent: &str) -> String {
    let canvas = params.get("canvasFP").map(String::as_str).unwrap_or("");
    let webgl = params.get("webglFP").map(String::as_str).unwrap_or("");
    let audio = params.get("audioFP").map(String::as_str).unwrap_or("");
    let platform = params.get("platform").map(String::as_str).unwrap_or("");
    let composite = format!("{canvas}|{webgl}|{audio}|{platform}|{user_agent}");
    hex::encode(Sha256::digest(composite.as_bytes()))
}

pub fn analyze(
    registry: &SessionRegistry,
    params: &HashMap<String, String>,
    user_agent: &str,
    page: &str,
    now: DateTime<Utc>,
    pairs: &mut Vec<(&'static str, String)>,
) {
    let hash = device_hash(params, user_agent);
    let touch = registry.touch(&hash, page, now);

    pairs.push(("sessionId", touch.session_id));
    pairs.push(("sessionHitNum", touch.hit_num.to_string()));
    pairs.push(("sessionDurationSec", touch.duration_secs.to_string()));
    pairs.push(("sessionPages", touch.page_count.to_string()));
}
