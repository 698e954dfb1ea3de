//! Analyzer 4 — datacenter match (spec §4.2.4): trie lookup, appends
//! `_srv_dc=<provider-tag>` on hit.

use std::net::IpAddr;

use smartpixl_core::ip::DatacenterTrie;

pub fn analyze(trie: &DatacenterTrie<String>, ip: IpAddr, pairs: &mut Vec<(&'static str, String)>) {
    if let Some(tag) = trie.lookup(ip) {
        pairs.push(("dc", tag));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartpixl_core::ip::CidrTrieSnapshot;
    use std::str::FromStr;

    #[test]
    fn hit_appends_provider_tag() {
        let v4 = vec![(ipnet::Ipv4Net::from_str("203.0.113.0/24").unwrap(), "A".to_string())];
        let trie = DatacenterTrie::new(CidrTrieSnapshot::build(&v4, &[]));
        let mut pairs = Vec::new();
        analyze(&trie, "203.0.113.9".parse().unwrap(), &mut pairs);
        assert_eq!(pairs, vec![("dc", "A".to_string())]);
    }

    #[test]
    fn miss_appends_nothing() {
        let trie: DatacenterTrie<String> = DatacenterTrie::new(CidrTrieSnapshot::build(&[], &[]));
        let mut pairs = Vec::new();
        analyze(&trie, "198.51.100.1".parse().unwrap(), &mut pairs);
        assert!(pairs.is_empty());
    }
}
