//! The in-flight envelope that rides from capture through to the bulk
//! insert (spec §3.1). Records are value-semantic: mutating the query
//! string means building a new `Record`, never mutating in place, so that
//! every enrichment stage can be reasoned about independently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_IDENTIFIER_LEN: usize = 64;
pub const MAX_REQUEST_PATH_LEN: usize = 8_192;
pub const MAX_QUERY_STRING_LEN: usize = 16_384;
pub const MAX_HEADER_VALUE_LEN: usize = 2_000;

/// Column ordinals for the raw row (spec §4.7) — used by the bulk writer's
/// streaming reader adapter and by anything that needs to describe the
/// fixed nine-column shape without re-deriving it from field order.
pub const COLUMN_NAMES: [&str; 9] = [
    "company_id",
    "pixel_id",
    "remote_address",
    "request_path",
    "query_string",
    "headers_json",
    "user_agent",
    "referer",
    "received_at",
];

/// The nine-field record that flows edge -> pipe -> engine -> store.
///
/// Field order here is the canonical column order (§4.7); do not reorder
/// without updating `COLUMN_NAMES` and the bulk writer's ordinal reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub company_id: String,
    pub pixel_id: String,
    pub remote_address: String,
    pub request_path: String,
    pub query_string: String,
    pub headers_json: String,
    pub user_agent: String,
    pub referer: String,
    pub received_at: DateTime<Utc>,
}

impl Record {
    /// Column `idx` (0-8, matching `COLUMN_NAMES` / spec §4.7) as text.
    ///
    /// Used by the bulk writer's streaming ordinal reader so the COPY
    /// encoder never has to build an intermediate row object — it just
    /// asks each record for column `n` in a loop.
    pub fn column_at(&self, idx: usize) -> std::borrow::Cow<'_, str> {
        use std::borrow::Cow;
        match idx {
            0 => Cow::Borrowed(&self.company_id),
            1 => Cow::Borrowed(&self.pixel_id),
            2 => Cow::Borrowed(&self.remote_address),
            3 => Cow::Borrowed(&self.request_path),
            4 => Cow::Borrowed(&self.query_string),
            5 => Cow::Borrowed(&self.headers_json),
            6 => Cow::Borrowed(&self.user_agent),
            7 => Cow::Borrowed(&self.referer),
            8 => Cow::Owned(self.received_at_rfc3339()),
            _ => panic!("Record::column_at: ordinal {idx} out of range 0..9"),
        }
    }

    pub fn received_at_rfc3339(&self) -> String {
        self.received_at.to_rfc3339()
    }

    /// Build a new record with `query_string` replaced. Enrichment never
    /// mutates a `Record` in place (spec §3.1: "Records are value-semantic").
    pub fn with_query_string(&self, query_string: String) -> Self {
        Self {
            query_string,
            ..self.clone()
        }
    }
}

/// `^[A-Za-z0-9_-]{1,64}$` — CompanyID / PixelID validation (spec §3.1, §4.1).
///
/// Hand-rolled rather than via the `regex` crate: this runs on every pixel
/// hit on the edge's latency-critical path, and the character class is
/// small enough that a linear scan is both simpler and faster than a
/// compiled automaton for single-shot matches.
pub fn is_valid_identifier(s: &str) -> bool {
    if s.is_empty() || s.len() > MAX_IDENTIFIER_LEN {
        return false;
    }
    s.bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Truncate a string to at most `max_chars` Unicode scalar values, never
/// splitting a multi-byte character. Defensive bound enforcement for
/// fields the HTTP layer hands us with only a soft ceiling (spec §3.1).
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_accepts_allowed_charset() {
        assert!(is_valid_identifier("ACME"));
        assert!(is_valid_identifier("abc_123-XYZ"));
    }

    #[test]
    fn identifier_rejects_oversized_and_empty() {
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier(&"a".repeat(65)));
        assert!(is_valid_identifier(&"a".repeat(64)));
    }

    #[test]
    fn identifier_rejects_disallowed_characters() {
        assert!(!is_valid_identifier("has space"));
        assert!(!is_valid_identifier("slash/here"));
        assert!(!is_valid_identifier("dots.not.allowed"));
    }

    #[test]
    fn truncate_chars_is_char_boundary_safe() {
        let s = "a".repeat(10);
        assert_eq!(truncate_chars(&s, 5).chars().count(), 5);
        assert_eq!(truncate_chars("short", 10), "short");
    }

    #[test]
    fn column_at_matches_fixed_ordinal_list() {
        let r = Record {
            company_id: "ACME".into(),
            pixel_id: "42".into(),
            remote_address: "203.0.113.9".into(),
            request_path: "/ACME/42_x_SMART.GIF".into(),
            query_string: "sw=1920".into(),
            headers_json: "{}".into(),
            user_agent: "ua".into(),
            referer: "ref".into(),
            received_at: Utc::now(),
        };
        for (idx, name) in COLUMN_NAMES.iter().enumerate() {
            let _ = name;
            let _ = r.column_at(idx);
        }
        assert_eq!(r.column_at(0), "ACME");
        assert_eq!(r.column_at(7), "ref");
        assert_eq!(r.column_at(8), r.received_at_rfc3339());
    }

    #[test]
    fn with_query_string_preserves_other_fields() {
        let r = Record {
            company_id: "ACME".into(),
            pixel_id: "42".into(),
            remote_address: "203.0.113.9".into(),
            request_path: "/ACME/42_x_SMART.GIF".into(),
            query_string: "sw=1920".into(),
            headers_json: "{}".into(),
            user_agent: "ua".into(),
            referer: "".into(),
            received_at: Utc::now(),
        };
        let r2 = r.with_query_string("sw=1920&_srv_hitType=modern".into());
        assert_eq!(r2.company_id, r.company_id);
        assert_eq!(r2.query_string, "sw=1920&_srv_hitType=modern");
        assert_ne!(r2.query_string, r.query_string);
    }
}
