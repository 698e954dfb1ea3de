//! Analyzer 5 — IP classification (spec §4.2.5): reserved-range
//! classification; on non-public, non-invalid result appends
//! `_srv_ipType=<enum-byte>`.

use std::net::IpAddr;

use smartpixl_core::ip::classify;

pub fn analyze(ip: IpAddr, pairs: &mut Vec<(&'static str, String)>) {
    let class = classify(ip);
    if class.is_reportable() {
        pairs.push(("ipType", class.as_enum_byte().to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_ip_appends_ip_type() {
        let mut pairs = Vec::new();
        analyze("10.0.0.1".parse().unwrap(), &mut pairs);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0, "ipType");
    }

    #[test]
    fn public_ip_appends_nothing() {
        let mut pairs = Vec::new();
        analyze("203.0.113.9".parse().unwrap(), &mut pairs);
        assert!(pairs.is_empty());
    }
}
