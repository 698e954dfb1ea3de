//! Analyzer 7 — timezone mismatch (spec §4.2.7): if the geo result
//! supplies an IANA timezone and the browser's `tz` param is present but
//! differs (case-insensitive), appends `_srv_geoTzMismatch=1`.

use std::collections::HashMap;

use crate::state::geo_cache::GeoResult;

pub fn analyze(
    geo: Option<&GeoResult>,
    params: &HashMap<String, String>,
    pairs: &mut Vec<(&'static str, String)>,
) {
    let Some(geo_tz) = geo.and_then(|g| g.timezone.as_deref()) else {
        return;
    };
    let Some(browser_tz) = params.get("tz") else {
        return;
    };
    if !geo_tz.eq_ignore_ascii_case(browser_tz) {
        pairs.push(("geoTzMismatch", "1".to_string()));
    }
}
