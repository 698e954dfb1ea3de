//! The engine's internal HTTP surface (spec §4.7, §6.3): health and
//! circuit-reset, both loopback/allow-list gated the same way the edge
//! gates its internal endpoints.

pub mod internal;

/// Mirrors `smartpixl-edge::http::is_same_host` — kept as its own copy
/// rather than a shared core helper since each process resolves its own
/// allow-list from its own config (spec §4.1, §6.3).
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
    }

    #[test]
    fn arbitrary_remote_is_not_same_host() {
        assert!(!is_same_host("198.51.100.1".parse().unwrap(), &[]));
    }
}
