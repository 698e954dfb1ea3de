//! Lead-quality score (spec §4.6 tier 2): a weighted sum of positive
//! signals — residential IP, stable fingerprint, real mouse entropy,
//! multiple fonts, clean canvas, matching timezone, multi-page session.
//! Output `_srv_leadScore=0..100`.
//!
//! Reads two sources: `params` (the record's own query string, which
//! already carries the edge's `_srv_*`-prefixed fast-enrichment output —
//! see `smartpixl_core::qs::append_pairs`) and `pairs` (this tier's own
//! accumulator, since tier 1 and the earlier tier-2 analyzers in this same
//! pass have already appended their un-prefixed findings to it).

use std::collections::HashMap;

const WEIGHT_RESIDENTIAL_IP: u32 = 20;
const WEIGHT_STABLE_FINGERPRINT: u32 = 15;
const WEIGHT_MOUSE_ENTROPY: u32 = 15;
const WEIGHT_MULTIPLE_FONTS: u32 = 15;
const WEIGHT_CLEAN_CANVAS: u32 = 15;
const WEIGHT_MATCHING_TIMEZONE: u32 = 10;
const WEIGHT_MULTI_PAGE_SESSION: u32 = 10;

const MIN_FONTS_FOR_SIGNAL: usize = 5;
const MIN_MOUSE_PATH_LEN: usize = 50;
const MIN_CANVAS_FP_LEN: usize = 10;

fn pair_value<'a>(pairs: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
    pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
}

pub fn analyze(params: &HashMap<String, String>, pairs: &mut Vec<(&'static str, String)>) {
    let mut score: u32 = 0;

    let residential_ip = !params.contains_key("_srv_dc")
        && !params.contains_key("_srv_ipType")
        && pair_value(pairs, "ipapiProxy").is_none();
    if residential_ip {
        score += WEIGHT_RESIDENTIAL_IP;
    }

    if !params.contains_key("_srv_fpAlert") {
        score += WEIGHT_STABLE_FINGERPRINT;
    }

    let mouse_entropy = params
        .get("mousePath")
        .map(|p| p.len() >= MIN_MOUSE_PATH_LEN)
        .unwrap_or(false);
    if mouse_entropy {
        score += WEIGHT_MOUSE_ENTROPY;
    }

    let font_count = params
        .get("fonts")
        .map(|f| f.split(',').filter(|s| !s.trim().is_empty()).count())
        .unwrap_or(0);
    if font_count >= MIN_FONTS_FOR_SIGNAL {
        score += WEIGHT_MULTIPLE_FONTS;
    }

    let clean_canvas = params
        .get("canvasFP")
        .map(|fp| fp.len() >= MIN_CANVAS_FP_LEN)
        .unwrap_or(false);
    if clean_canvas {
        score += WEIGHT_CLEAN_CANVAS;
    }

    let matching_timezone = params.contains_key("tz") && !params.contains_key("_srv_geoTzMismatch");
    if matching_timezone {
        score += WEIGHT_MATCHING_TIMEZONE;
    }

    let multi_page_session = pair_value(pairs, "sessionPages")
        .and_then(|v| v.parse::<u32>().ok())
        .map(|n| n > 1)
        .unwrap_or(false);
    if multi_page_session {
        score += WEIGHT_MULTI_PAGE_SESSION;
    }

    pairs.push(("leadScore", score.to_string()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_signals_yields_zero() {
        let mut pairs = Vec::new();
        analyze(&HashMap::new(), &mut pairs);
        assert_eq!(pair_value(&pairs, "leadScore"), Some("0"));
    }

    #[test]
    fn all_positive_signals_sum_to_one_hundred() {
        let mut params = HashMap::new();
        params.insert("mousePath".to_string(), "m".repeat(60));
        params.insert("fonts".to_string(), "Arial,Helvetica,Times,Georgia,Verdana".to_string());
        params.insert("canvasFP".to_string(), "abcdefghijklmnop".to_string());
        params.insert("tz".to_string(), "America/New_York".to_string());

        let mut pairs = vec![("sessionPages", "3".to_string())];
        analyze(&params, &mut pairs);
        assert_eq!(pair_value(&pairs, "leadScore"), Some("100"));
    }

    #[test]
    fn datacenter_marker_drops_residential_weight() {
        let mut params = HashMap::new();
        params.insert("_srv_dc".to_string(), "A".to_string());
        let mut pairs = Vec::new();
        analyze(&params, &mut pairs);
        let score: u32 = pair_value(&pairs, "leadScore").unwrap().parse().unwrap();
        assert!(score <= 100 - WEIGHT_RESIDENTIAL_IP);
    }
}
