//! Query-string parsing and `_srv_*` pair appending (spec §3.1, §4.2, §4.6):
//! both the edge's fast-enrichment bank and the engine's tiered pipeline
//! append enrichment output the same way, so the encode/decode pair lives
//! here rather than being duplicated per process.

use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use std::collections::HashMap;

/// Parse a raw query string into a decoded key/value map. Read-only use —
/// analyzers never rebuild the query string from this map, only from the
/// original bytes plus newly appended pairs (`append_pairs`).
pub fn parse_query_params(query_string: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for pair in query_string.split('&').filter(|p| !p.is_empty()) {
        let mut parts = pair.splitn(2, '=');
        let key = parts.next().unwrap_or("");
        let value = parts.next().unwrap_or("");
        if key.is_empty() {
            continue;
        }
        let decoded_key = percent_decode_str(key).decode_utf8_lossy().into_owned();
        let decoded_value = percent_decode_str(value).decode_utf8_lossy().into_owned();
        params.insert(decoded_key, decoded_value);
    }
    params
}

/// Append `_srv_<name>=<urlencoded value>` pairs onto an existing query
/// string, returning a new owned string. Only called when `pairs` is
/// nonempty — the caller decides whether anything fired.
pub fn append_pairs(query_string: &str, pairs: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(
        query_string.len() + pairs.iter().map(|(k, v)| k.len() + v.len() + 16).sum::<usize>(),
    );
    out.push_str(query_string);
    for (key, value) in pairs {
        if !out.is_empty() {
            out.push('&');
        }
        out.push_str("_srv_");
        out.push_str(key);
        out.push('=');
        out.push_str(&utf8_percent_encode(value, NON_ALPHANUMERIC).to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_query_params_decodes_percent_encoding() {
        let params = parse_query_params("tz=America%2FNew_York&sw=1920");
        assert_eq!(params.get("tz").unwrap(), "America/New_York");
        assert_eq!(params.get("sw").unwrap(), "1920");
    }

    #[test]
    fn parse_query_params_ignores_empty_string() {
        assert!(parse_query_params("").is_empty());
    }

    #[test]
    fn append_pairs_joins_with_ampersand_and_encodes_values() {
        let out = append_pairs("sw=1920", &[("hitType", "modern".to_string())]);
        assert_eq!(out, "sw=1920&_srv_hitType=modern");
    }

    #[test]
    fn append_pairs_on_empty_query_string_has_no_leading_ampersand() {
        let out = append_pairs("", &[("botTrap", "1".to_string())]);
        assert_eq!(out, "_srv_botTrap=1");
    }
}
