//! Offline geo (spec §4.6 tier 1): a MaxMind-format `.mmdb` lookup,
//! reloaded weekly (the dataset file is swapped on disk by an external
//! process; this reader is opened fresh at start-up and whenever the
//! engine is restarted). Appends `_srv_mm*`; skipped entirely when no
//! database path is configured.
//!
//! Grounded in `other_examples`'s Sparklytics `collect.rs`: `Reader::
//! from_source(bytes)` then `lookup(ip).ok()?.decode::<geoip2::City>()`.

use std::net::IpAddr;
use std::path::Path;

use chrono::{DateTime, Utc};
use maxminddb::geoip2;

pub struct OfflineGeoResult {
    pub country_code: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timezone: Option<String>,
    pub asn: Option<u32>,
    pub asn_org: Option<String>,
}

/// Wraps an optional city database and an optional ASN database (two
/// separate MaxMind products in practice). Either, both, or neither may be
/// configured; a missing reader just means that half of the result stays
/// `None`.
pub struct OfflineGeoDb {
    city: Option<maxminddb::Reader<Vec<u8>>>,
    asn: Option<maxminddb::Reader<Vec<u8>>>,
    loaded_at: DateTime<Utc>,
}

/// Dataset considered stale past this age (spec §4.6: "older than 90
/// days" triggers the conditional online-geo fallback).
const STALE_AFTER_DAYS: i64 = 90;

impl OfflineGeoDb {
    pub fn open(city_path: Option<&Path>, asn_path: Option<&Path>) -> Self {
        Self {
            city: city_path.and_then(open_reader),
            asn: asn_path.and_then(open_reader),
            loaded_at: Utc::now(),
        }
    }

    pub fn empty() -> Self {
        Self { city: None, asn: None, loaded_at: Utc::now() }
    }

    pub fn is_configured(&self) -> bool {
        self.city.is_some() || self.asn.is_some()
    }

    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        (now - self.loaded_at).num_days() >= STALE_AFTER_DAYS
    }

    pub fn lookup(&self, ip: IpAddr) -> Option<OfflineGeoResult> {
        let city_record = self.city.as_ref().and_then(|reader| lookup_city(reader, ip));
        let asn_record = self.asn.as_ref().and_then(|reader| lookup_asn(reader, ip));

        if city_record.is_none() && asn_record.is_none() {
            return None;
        }

        let (country_code, region, city, latitude, longitude, timezone) = match city_record {
            Some(c) => (
                c.country.and_then(|c| c.iso_code.map(str::to_string)),
                c.subdivisions
                    .and_then(|s| s.first().and_then(|sub| sub.names.as_ref()).and_then(|n| n.en).map(str::to_string)),
                c.city
                    .and_then(|c| c.names)
                    .and_then(|n| n.en)
                    .map(str::to_string),
                c.location.as_ref().and_then(|l| l.latitude),
                c.location.as_ref().and_then(|l| l.longitude),
                c.location.as_ref().and_then(|l| l.time_zone).map(str::to_string),
            ),
            None => (None, None, None, None, None, None),
        };

        let (asn, asn_org) = match asn_record {
            Some(a) => (a.autonomous_system_number, a.autonomous_system_organization.map(str::to_string)),
            None => (None, None),
        };

        Some(OfflineGeoResult { country_code, region, city, latitude, longitude, timezone, asn, asn_org })
    }
}

fn open_reader(path: &Path) -> Option<maxminddb::Reader<Vec<u8>>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(path = %path.display(), err = %e, "offline geo: failed to read database file");
            return None;
        }
    };
    match maxminddb::Reader::from_source(bytes) {
        Ok(reader) => Some(reader),
        Err(e) => {
            tracing::warn!(path = %path.display(), err = %e, "offline geo: failed to parse database");
            None
        }
    }
}

fn lookup_city(reader: &maxminddb::Reader<Vec<u8>>, ip: IpAddr) -> Option<geoip2::City> {
    reader.lookup(ip).ok()?.decode::<geoip2::City>().ok().flatten()
}

fn lookup_asn(reader: &maxminddb::Reader<Vec<u8>>, ip: IpAddr) -> Option<geoip2::Asn> {
    reader.lookup(ip).ok()?.decode::<geoip2::Asn>().ok().flatten()
}

/// Append `_srv_mmCC`, `_srv_mmReg`, `_srv_mmCity`, `_srv_mmLat`,
/// `_srv_mmLon`, `_srv_mmASN`, `_srv_mmASNOrg` for whichever fields the
/// lookup actually returned.
pub fn append(result: Option<&OfflineGeoResult>, pairs: &mut Vec<(&'static str, String)>) {
    let Some(r) = result else { return };
    if let Some(cc) = &r.country_code {
        pairs.push(("mmCC", cc.clone()));
    }
    if let Some(region) = &r.region {
        pairs.push(("mmReg", region.clone()));
    }
    if let Some(city) = &r.city {
        pairs.push(("mmCity", city.clone()));
    }
    if let Some(lat) = r.latitude {
        pairs.push(("mmLat", lat.to_string()));
    }
    if let Some(lon) = r.longitude {
        pairs.push(("mmLon", lon.to_string()));
    }
    if let Some(asn) = r.asn {
        pairs.push(("mmASN", asn.to_string()));
    }
    if let Some(org) = &r.asn_org {
        pairs.push(("mmASNOrg", org.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_db_is_not_configured_and_lookup_misses() {
        let db = OfflineGeoDb::empty();
        assert!(!db.is_configured());
        assert!(db.lookup("203.0.113.9".parse().unwrap()).is_none());
    }

    #[test]
    fn freshly_opened_db_is_not_stale() {
        let db = OfflineGeoDb::empty();
        assert!(!db.is_stale(Utc::now()));
    }

    #[test]
    fn db_is_stale_past_ninety_days() {
        let db = OfflineGeoDb::empty();
        assert!(db.is_stale(Utc::now() + chrono::Duration::days(91)));
    }

    #[test]
    fn append_with_none_result_adds_nothing() {
        let mut pairs = Vec::new();
        append(None, &mut pairs);
        assert!(pairs.is_empty());
    }

    #[test]
    fn append_emits_only_present_fields() {
        let result = OfflineGeoResult {
            country_code: Some("US".into()),
            region: None,
            city: None,
            latitude: Some(40.7),
            longitude: None,
            timezone: None,
            asn: Some(15169),
            asn_org: Some("Google LLC".into()),
        };
        let mut pairs = Vec::new();
        append(Some(&result), &mut pairs);
        assert!(pairs.contains(&("mmCC", "US".to_string())));
        assert!(pairs.contains(&("mmLat", "40.7".to_string())));
        assert!(pairs.contains(&("mmASN", "15169".to_string())));
        assert!(pairs.contains(&("mmASNOrg", "Google LLC".to_string())));
        assert!(!pairs.iter().any(|(k, _)| *k == "mmReg"));
    }
}
