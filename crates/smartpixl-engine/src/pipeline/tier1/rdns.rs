//! Reverse DNS (spec §4.6 tier 1): `_srv_rdns` plus `_srv_rdnsCloud` when
//! the resolved hostname matches a cloud-provider naming convention.
//! 2s timeout, skip on failure — `dns-lookup` (thin safe wrapper over
//! `getnameinfo`, per `SPEC_FULL.md` §2) has no async variant, so the
//! blocking call runs on `spawn_blocking` under `tokio::time::timeout`.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use dns_lookup::getnameinfo;

const CLOUD_HOSTNAME_MARKERS: &[&str] = &[
    "amazonaws.com",
    "googleusercontent.com",
    "azure.com",
    "cloudapp.net",
    "ovh.net",
    "digitalocean.com",
    "linode.com",
    "hetzner.com",
];

fn cloud_provider_for_hostname(hostname: &str) -> Option<&'static str> {
    let lowered = hostname.to_ascii_lowercase();
    CLOUD_HOSTNAME_MARKERS
        .iter()
        .find(|marker| lowered.ends_with(*marker))
        .copied()
}

async fn resolve(ip: IpAddr) -> Option<String> {
    tokio::task::spawn_blocking(move || {
        let socket = SocketAddr::new(ip, 0);
        getnameinfo(&socket, 0).ok().map(|(host, _service)| host)
    })
    .await
    .ok()
    .flatten()
}

pub async fn analyze(ip: IpAddr, timeout: Duration, pairs: &mut Vec<(&'static str, String)>) {
    let hostname = match tokio::time::timeout(timeout, resolve(ip)).await {
        Ok(Some(hostname)) => hostname,
        Ok(None) => return,
        Err(_) => {
            tracing::debug!(%ip, "reverse dns: timed out");
            return;
        }
    };

    if let Some(provider) = cloud_provider_for_hostname(&hostname) {
        pairs.push(("rdnsCloud", provider.to_string()));
    }
    pairs.push(("rdns", hostname));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_known_cloud_hostname_suffixes() {
        assert_eq!(
            cloud_provider_for_hostname("ec2-1-2-3-4.compute-1.amazonaws.com"),
            Some("amazonaws.com")
        );
        assert_eq!(cloud_provider_for_hostname("example.com"), None);
    }

    #[tokio::test]
    async fn unresolvable_ip_yields_no_pairs_within_timeout() {
        let mut pairs = Vec::new();
        // TEST-NET-1, never resolves.
        analyze("192.0.2.123".parse().unwrap(), Duration::from_millis(200), &mut pairs).await;
        assert!(pairs.is_empty());
    }
}
