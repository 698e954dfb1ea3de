//! URL-shape recognition and HTTP-to-`Record` capture (spec §4.1, §3.1).
//!
//! Parsing is hand-rolled string splitting, not a regex — the same choice
//! the teacher makes for validation in `daemon/src/security.rs`: the shape
//! is fixed and small enough that an automaton is unneeded overhead on the
//! hottest path in the system.

use std::collections::BTreeMap;
use std::net::IpAddr;

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use smartpixl_core::record::{truncate_chars, MAX_HEADER_VALUE_LEN, MAX_QUERY_STRING_LEN, MAX_REQUEST_PATH_LEN};
use smartpixl_core::Record;

/// Header names captured into `HeadersJson` (spec §3.1: "captured header
/// subset"). Everything else is discarded — the raw row is not a full
/// header dump.
const CAPTURED_HEADERS: &[&str] = &[
    "accept",
    "accept-language",
    "accept-encoding",
    "dnt",
    "connection",
    "sec-ch-ua",
    "sec-ch-ua-mobile",
    "sec-ch-ua-platform",
    "sec-fetch-site",
    "sec-fetch-mode",
    "sec-fetch-dest",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelKind {
    Gif,
    Js,
}

#[derive(Debug, Clone)]
pub struct PixelPath {
    pub company: String,
    pub pixel: String,
    pub domain: String,
    pub kind: PixelKind,
}

/// Recognize `/{company}/{pixel}_{domain}_SMART.GIF` or `..._SMART.js`
/// (spec §4.1). The pixel/domain split is on the first `_` in the stem —
/// the convention the browser script's generated tag follows.
pub fn parse_pixel_path(path: &str) -> Option<PixelPath> {
    let trimmed = path.strip_prefix('/')?;
    let mut segments = trimmed.splitn(2, '/');
    let company = segments.next()?;
    let rest = segments.next()?;
    if company.is_empty() || rest.is_empty() {
        return None;
    }

    let (stem, kind) = if let Some(stem) = rest.strip_suffix("_SMART.GIF") {
        (stem, PixelKind::Gif)
    } else if let Some(stem) = rest.strip_suffix("_SMART.js") {
        (stem, PixelKind::Js)
    } else {
        return None;
    };

    let (pixel, domain) = stem.split_once('_')?;
    if pixel.is_empty() || domain.is_empty() {
        return None;
    }

    Some(PixelPath {
        company: company.to_string(),
        pixel: pixel.to_string(),
        domain: domain.to_string(),
        kind,
    })
}

fn captured_headers_json(headers: &HeaderMap) -> String {
    let mut map = BTreeMap::new();
    for name in CAPTURED_HEADERS {
        if let Some(value) = headers.get(*name).and_then(|v| v.to_str().ok()) {
            map.insert(name.to_string(), truncate_chars(value, MAX_HEADER_VALUE_LEN));
        }
    }
    serde_json::to_string(&map).unwrap_or_else(|_| "{}".to_string())
}

/// Build the in-flight [`Record`] from the pieces axum's extractors hand
/// us. `bot_trap` is not recorded here — the caller appends
/// `_srv_botTrap=1` itself via the enrichment bank's pair-append path so
/// capture stays a pure "what did the client send" function.
pub fn build_record(
    company: &str,
    pixel: &str,
    remote_address: IpAddr,
    request_path: &str,
    query_string: &str,
    headers: &HeaderMap,
    now: DateTime<Utc>,
) -> Record {
    let user_agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let referer = headers
        .get("referer")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| {
            // Referer header fallback: `ref` query param (spec §3.1).
            query_param(query_string, "ref").unwrap_or_default()
        });

    Record {
        company_id: company.to_string(),
        pixel_id: pixel.to_string(),
        remote_address: remote_address.to_string(),
        request_path: truncate_chars(request_path, MAX_REQUEST_PATH_LEN),
        query_string: truncate_chars(query_string, MAX_QUERY_STRING_LEN),
        headers_json: captured_headers_json(headers),
        user_agent: truncate_chars(user_agent, MAX_HEADER_VALUE_LEN),
        referer: truncate_chars(&referer, MAX_HEADER_VALUE_LEN),
        received_at: now,
    }
}

fn query_param(query_string: &str, key: &str) -> Option<String> {
    query_string.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        if k == key {
            Some(
                percent_encoding::percent_decode_str(v)
                    .decode_utf8_lossy()
                    .into_owned(),
            )
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_gif_shape() {
        let p = parse_pixel_path("/ACME/42_thetriviaquest.com_SMART.GIF").unwrap();
        assert_eq!(p.company, "ACME");
        assert_eq!(p.pixel, "42");
        assert_eq!(p.domain, "thetriviaquest.com");
        assert_eq!(p.kind, PixelKind::Gif);
    }

    #[test]
    fn parses_js_shape() {
        let p = parse_pixel_path("/ACME/42_example.com_SMART.js").unwrap();
        assert_eq!(p.kind, PixelKind::Js);
    }

    #[test]
    fn non_matching_shape_returns_none() {
        assert!(parse_pixel_path("/wp-admin/xmlrpc.php").is_none());
        assert!(parse_pixel_path("/health").is_none());
    }

    #[test]
    fn missing_pixel_or_domain_returns_none() {
        assert!(parse_pixel_path("/ACME/_SMART.GIF").is_none());
        assert!(parse_pixel_path("/ACME/42_SMART.GIF").is_none());
    }

    #[test]
    fn build_record_falls_back_to_ref_query_param_when_no_referer_header() {
        let headers = HeaderMap::new();
        let record = build_record(
            "ACME",
            "42",
            "203.0.113.9".parse().unwrap(),
            "/ACME/42_x_SMART.GIF",
            "ref=https%3A%2F%2Fexample.com",
            &headers,
            Utc::now(),
        );
        assert_eq!(record.referer, "https://example.com");
    }

    #[test]
    fn build_record_prefers_referer_header_over_query_param() {
        let mut headers = HeaderMap::new();
        headers.insert("referer", "https://header.example".parse().unwrap());
        let record = build_record(
            "ACME",
            "42",
            "203.0.113.9".parse().unwrap(),
            "/ACME/42_x_SMART.GIF",
            "ref=https%3A%2F%2Fquery.example",
            &headers,
            Utc::now(),
        );
        assert_eq!(record.referer, "https://header.example");
    }
}
