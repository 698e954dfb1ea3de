//! Behavioral replay (spec §4.6 tier 3): wraps
//! [`crate::state::replay::ReplayIndex`], flagging `_srv_replayDetected=1`
//! plus `_srv_replayMatchFP=<orig>` when the same mouse path is observed
//! under a different fingerprint.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::state::replay::ReplayIndex;

pub fn analyze(
    index: &ReplayIndex,
    params: &HashMap<String, String>,
    now: DateTime<Utc>,
    pairs: &mut Vec<(&'static str, String)>,
) {
    let mouse_path = params.get("mousePath").map(String::as_str).unwrap_or("");
    let canvas_fp = params.get("canvasFP").map(String::as_str).unwrap_or("");
    if mouse_path.is_empty() || canvas_fp.is_empty() {
        return;
    }

    let check = index.check(mouse_path, canvas_fp, now);
    if check.is_replay {
        pairs.push(("replayDetected", "1".to_string()));
        if let Some(orig) = check.originating_fp {
            pairs.push(("replayMatchFP", orig));
        }
    }
}
