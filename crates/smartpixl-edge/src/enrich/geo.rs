//! Analyzer 6 — geo lookup (spec §4.2.6): two-tier cache; on hit appends
//! `_srv_geoCC`, `_srv_geoReg`, `_srv_geoCity`, `_srv_geoTz`, `_srv_geoISP`,
//! and conditional `_srv_geoProxy=1`, `_srv_geoMobile=1`.

use std::net::IpAddr;

use crate::state::geo_cache::{GeoCache, GeoResult};

/// Returns the resolved geo result (if any) so the timezone-mismatch
/// analyzer downstream can reuse it without a second cache lookup.
pub fn analyze(cache: &GeoCache, ip: IpAddr, pairs: &mut Vec<(&'static str, String)>) -> Option<GeoResult> {
    let result = cache.get(ip)?;

    pairs.push(("geoCC", result.country_code.clone()));
    pairs.push(("geoReg", result.region.clone()));
    pairs.push(("geoCity", result.city.clone()));
    if let Some(tz) = &result.timezone {
        pairs.push(("geoTz", tz.clone()));
    }
    pairs.push(("geoISP", result.isp.clone()));
    if result.is_proxy {
        pairs.push(("geoProxy", "1".to_string()));
    }
    if result.is_mobile {
        pairs.push(("geoMobile", "1".to_string()));
    }

    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_miss_appends_nothing_and_returns_none() {
        let cache = GeoCache::new(3600, 16);
        let mut pairs = Vec::new();
        let result = analyze(&cache, "203.0.113.9".parse().unwrap(), &mut pairs);
        assert!(result.is_none());
        assert!(pairs.is_empty());
    }

    #[test]
    fn cache_hit_appends_all_core_pairs_and_conditional_ones() {
        let cache = GeoCache::new(3600, 16);
        let ip: IpAddr = "203.0.113.9".parse().unwrap();
        cache.populate(
            ip,
            GeoResult {
                country_code: "US".into(),
                region: "NY".into(),
                city: "New York".into(),
                timezone: Some("America/New_York".into()),
                isp: "Acme".into(),
                is_proxy: true,
                is_mobile: false,
            },
        );
        let mut pairs = Vec::new();
        let result = analyze(&cache, ip, &mut pairs);
        assert!(result.is_some());
        assert!(pairs.iter().any(|(k, v)| *k == "geoCC" && v == "US"));
        assert!(pairs.iter().any(|(k, v)| *k == "geoProxy" && v == "1"));
        assert!(!pairs.iter().any(|(k, _)| *k == "geoMobile"));
    }
}
