//! Behavioral-replay index (spec §3.3, §4.6 tier-3 "Behavioral replay"):
//! `hash(mousePath) -> (originating fingerprint, first-seen)`. A replay of
//! the same mouse path under a *different* fingerprint is flagged. Entries
//! expire at 1h.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sha2::{Digest, Sha256};

const TTL_SECS: i64 = 3600;

struct ReplayEntry {
    originating_fp: String,
    first_seen: DateTime<Utc>,
    last_seen: DateTime<Utc>,
}

/// Outcome of checking one mouse path: whether it's a replay under a
/// different fingerprint, and (if so) the fingerprint that originated it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayCheck {
    pub is_replay: bool,
    pub originating_fp: Option<String>,
}

pub struct ReplayIndex {
    entries: DashMap<String, ReplayEntry>,
}

fn hash_mouse_path(mouse_path: &str) -> String {
    let digest = Sha256::digest(mouse_path.as_bytes());
    hex::encode(digest)
}

impl Default for ReplayIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplayIndex {
    pub fn new() -> Self {
        Self { entries: DashMap::new() }
    }

    /// Check `mouse_path` against the index for `fingerprint`, recording
    /// this observation. The first observer of a path is never a replay;
    /// later observers are a replay only if their fingerprint differs from
    /// the one that first produced this path.
    pub fn check(&self, mouse_path: &str, fingerprint: &str, now: DateTime<Utc>) -> ReplayCheck {
        if mouse_path.is_empty() {
            return ReplayCheck { is_replay: false, originating_fp: None };
        }
        let key = hash_mouse_path(mouse_path);

        let mut entry = self.entries.entry(key).or_insert_with(|| ReplayEntry {
            originating_fp: fingerprint.to_string(),
            first_seen: now,
            last_seen: now,
        });
        entry.last_seen = now;

        if entry.originating_fp == fingerprint {
            ReplayCheck { is_replay: false, originating_fp: None }
        } else {
            ReplayCheck {
                is_replay: true,
                originating_fp: Some(entry.originating_fp.clone()),
            }
        }
    }

    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| (now - entry.last_seen).num_seconds() <= TTL_SECS);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

pub type SharedReplayIndex = Arc<ReplayIndex>;
