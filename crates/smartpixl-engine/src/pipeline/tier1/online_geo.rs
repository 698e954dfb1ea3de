//! Online geo (spec §4.6 tier 1, conditional): queried only when the IP
//! missed the offline database or that database is stale (§9's 90-day
//! rule). Respects a configured upstream rate limit via `governor`
//! (grounded in `knhk-workflow-engine`'s `RateLimiter`); a rate-limited or
//! failed call is skipped, never retried inline.

use std::net::IpAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{DefaultDirectRateLimiter, Quota};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
struct IpApiResponse {
    #[serde(rename = "countryCode")]
    country_code: Option<String>,
    isp: Option<String>,
    proxy: Option<bool>,
    mobile: Option<bool>,
    #[serde(rename = "as")]
    asn_line: Option<String>,
    query: Option<String>,
}

pub struct OnlineGeoClient {
    client: reqwest::Client,
    endpoint: Option<String>,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl OnlineGeoClient {
    pub fn new(endpoint: Option<String>, requests_per_second: u32) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(requests_per_second.max(1)).unwrap());
        Self {
            client: reqwest::Client::new(),
            endpoint,
            limiter: Arc::new(governor::RateLimiter::direct(quota)),
        }
    }

    /// Returns `true` when the analyzer should run at all (an endpoint is
    /// configured and `ip` missed, or is stale in, the offline dataset).
    pub fn should_query(&self, offline_hit: bool, offline_stale: bool) -> bool {
        self.endpoint.is_some() && (!offline_hit || offline_stale)
    }

    async fn fetch(&self, ip: IpAddr) -> anyhow::Result<Option<IpApiResponse>> {
        let Some(endpoint) = &self.endpoint else {
            return Ok(None);
        };
        if self.limiter.check().is_err() {
            tracing::debug!(%ip, "online geo: rate limited, skipping");
            return Ok(None);
        }
        let url = format!("{endpoint}/{ip}");
        let resp = self.client.get(url).send().await?.error_for_status()?;
        Ok(Some(resp.json::<IpApiResponse>().await?))
    }
}

/// Parse the trailing ASN number out of an ip-api.com-style `"AS15169
/// Google LLC"` line.
fn extract_asn(line: &str) -> Option<String> {
    line.strip_prefix("AS")?.split_whitespace().next().map(str::to_string)
}

pub async fn analyze(client: &OnlineGeoClient, ip: IpAddr, offline_hit: bool, offline_stale: bool, pairs: &mut Vec<(&'static str, String)>) {
    if !client.should_query(offline_hit, offline_stale) {
        return;
    }
    match client.fetch(ip).await {
        Ok(Some(resp)) => {
            if let Some(cc) = resp.country_code {
                pairs.push(("ipapiCC", cc));
            }
            if let Some(isp) = resp.isp {
                pairs.push(("ipapiISP", isp));
            }
            if resp.proxy.unwrap_or(false) {
                pairs.push(("ipapiProxy", "1".to_string()));
            }
            if resp.mobile.unwrap_or(false) {
                pairs.push(("ipapiMobile", "1".to_string()));
            }
            if let Some(asn) = resp.asn_line.as_deref().and_then(extract_asn) {
                pairs.push(("ipapiASN", asn));
            }
            if let Some(reverse) = resp.query {
                pairs.push(("ipapiReverse", reverse));
            }
        }
        Ok(None) => {}
        Err(e) => tracing::debug!(%ip, err = %e, "online geo: lookup failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_query_false_without_endpoint() {
        let client = OnlineGeoClient::new(None, 5);
        assert!(!client.should_query(false, false));
    }

    #[test]
    fn should_query_true_on_offline_miss() {
        let client = OnlineGeoClient::new(Some("https://example.invalid".to_string()), 5);
        assert!(client.should_query(false, false));
    }

    #[test]
    fn should_query_false_on_fresh_offline_hit() {
        let client = OnlineGeoClient::new(Some("https://example.invalid".to_string()), 5);
        assert!(!client.should_query(true, false));
    }

    #[test]
    fn should_query_true_on_stale_offline_hit() {
        let client = OnlineGeoClient::new(Some("https://example.invalid".to_string()), 5);
        assert!(client.should_query(true, true));
    }

    #[test]
    fn extract_asn_parses_as_line() {
        assert_eq!(extract_asn("AS15169 Google LLC"), Some("15169".to_string()));
        assert_eq!(extract_asn(""), None);
    }
}
