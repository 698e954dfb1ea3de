//! WHOIS / ASN (spec §4.6 tier 1): fills in `_srv_whoisASN` /
//! `_srv_whoisOrg` only when neither the offline database nor the online
//! geo lookup already resolved an ASN for this IP. Best-effort, no retry;
//! the spec permits this analyzer to run asynchronously relative to the
//! rest of the pipeline, but nothing here depends on ordering against the
//! other tier-1 analyzers, so it runs inline like the rest with its own
//! short timeout.

use std::net::IpAddr;
use std::time::Duration;

use serde::Deserialize;

const TIMEOUT: Duration = Duration::from_millis(800);

#[derive(Debug, Deserialize)]
struct RdapAsnResponse {
    #[serde(rename = "asn")]
    asn: Option<String>,
    name: Option<String>,
}

pub struct WhoisClient {
    client: reqwest::Client,
    endpoint: Option<String>,
}

impl WhoisClient {
    pub fn new(endpoint: Option<String>) -> Self {
        Self { client: reqwest::Client::new(), endpoint }
    }

    async fn fetch(&self, ip: IpAddr) -> anyhow::Result<Option<RdapAsnResponse>> {
        let Some(endpoint) = &self.endpoint else {
            return Ok(None);
        };
        let url = format!("{endpoint}/{ip}");
        let resp = self.client.get(url).send().await?.error_for_status()?;
        Ok(Some(resp.json::<RdapAsnResponse>().await?))
    }
}

pub async fn analyze(client: &WhoisClient, ip: IpAddr, already_resolved: bool, pairs: &mut Vec<(&'static str, String)>) {
    if already_resolved {
        return;
    }
    match tokio::time::timeout(TIMEOUT, client.fetch(ip)).await {
        Ok(Ok(Some(resp))) => {
            if let Some(asn) = resp.asn {
                pairs.push(("whoisASN", asn));
            }
            if let Some(org) = resp.name {
                pairs.push(("whoisOrg", org));
            }
        }
        Ok(Ok(None)) => {}
        Ok(Err(e)) => tracing::debug!(%ip, err = %e, "whois/asn: lookup failed"),
        Err(_) => tracing::debug!(%ip, "whois/asn: timed out"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn already_resolved_skips_the_call_entirely() {
        let client = WhoisClient::new(None);
        let mut pairs = Vec::new();
        analyze(&client, "203.0.113.9".parse().unwrap(), true, &mut pairs).await;
        assert!(pairs.is_empty());
    }

    #[tokio::test]
    async fn unconfigured_endpoint_yields_no_pairs() {
        let client = WhoisClient::new(None);
        let mut pairs = Vec::new();
        analyze(&client, "203.0.113.9".parse().unwrap(), false, &mut pairs).await;
        assert!(pairs.is_empty());
    }
}
