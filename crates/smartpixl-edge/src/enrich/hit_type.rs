//! Analyzer 1 — hit-type tag (spec §4.2.1).

use std::collections::HashMap;

pub fn analyze(params: &HashMap<String, String>, pairs: &mut Vec<(&'static str, String)>) {
    let modern = params.contains_key("sw") || params.contains_key("canvasFP");
    pairs.push(("hitType", if modern { "modern" } else { "legacy" }.to_string()));
}
