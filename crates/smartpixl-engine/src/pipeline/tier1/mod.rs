//! Tier 1 — library-backed lookups (spec §4.6): bot-UA detection, UA
//! parsing, reverse DNS, offline geo, conditional online geo, and
//! WHOIS/ASN. Each analyzer is independent and best-effort; a failure in
//! one never blocks the others or the record.

pub mod bot_ua;
pub mod offline_geo;
pub mod online_geo;
pub mod rdns;
pub mod ua_parse;
pub mod whois_asn;

use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use chrono::Utc;

pub struct Tier1Context {
    pub offline_geo: offline_geo::OfflineGeoDb,
    pub online_geo: online_geo::OnlineGeoClient,
    pub whois: whois_asn::WhoisClient,
    pub rdns_timeout: Duration,
}

impl Tier1Context {
    pub fn new(
        offline_geo_city_path: Option<&Path>,
        offline_geo_asn_path: Option<&Path>,
        online_geo_endpoint: Option<String>,
        online_geo_rps: u32,
        whois_endpoint: Option<String>,
        rdns_timeout: Duration,
    ) -> Self {
        Self {
            offline_geo: offline_geo::OfflineGeoDb::open(offline_geo_city_path, offline_geo_asn_path),
            online_geo: online_geo::OnlineGeoClient::new(online_geo_endpoint, online_geo_rps),
            whois: whois_asn::WhoisClient::new(whois_endpoint),
            rdns_timeout,
        }
    }

    /// Run every tier-1 analyzer over `user_agent`/`ip`, appending pairs in
    /// the order listed in spec §4.6's tier-1 table.
    pub async fn run(&self, user_agent: &str, ip: Option<IpAddr>, pairs: &mut Vec<(&'static str, String)>) {
        bot_ua::analyze(user_agent, pairs);
        ua_parse::analyze(user_agent, pairs);

        let Some(ip) = ip else { return };

        rdns::analyze(ip, self.rdns_timeout, pairs).await;

        let now = Utc::now();
        let offline = self.offline_geo.lookup(ip);
        let offline_hit = offline.is_some();
        let offline_asn_resolved = offline.as_ref().and_then(|r| r.asn).is_some();
        offline_geo::append(offline.as_ref(), pairs);

        online_geo::analyze(&self.online_geo, ip, offline_hit, self.offline_geo.is_stale(now), pairs).await;
        let asn_already_resolved = offline_asn_resolved || pairs.iter().any(|(k, _)| *k == "ipapiASN");
        whois_asn::analyze(&self.whois, ip, asn_already_resolved, pairs).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_with_no_configured_backends_only_fires_ua_and_bot() {
        let ctx = Tier1Context::new(None, None, None, 5, None, Duration::from_millis(100));
        let mut pairs = Vec::new();
        ctx.run("Mozilla/5.0 Googlebot/2.1", Some("203.0.113.9".parse().unwrap()), &mut pairs).await;
        assert!(pairs.iter().any(|(k, _)| *k == "knownBot"));
        assert!(!pairs.iter().any(|(k, _)| *k == "mmCC"));
        assert!(!pairs.iter().any(|(k, _)| *k == "ipapiCC"));
    }

    #[tokio::test]
    async fn run_with_no_ip_skips_ip_bound_analyzers() {
        let ctx = Tier1Context::new(None, None, None, 5, None, Duration::from_millis(100));
        let mut pairs = Vec::new();
        ctx.run("curl/8.0", None, &mut pairs).await;
        assert!(pairs.iter().any(|(k, v)| *k == "knownBot" && v == "1"));
    }
}
