//! Session registry (spec §3.3, §4.6 tier-2 "Session stitcher"): keyed by
//! composite device hash. A session ends when idle for more than 30
//! minutes; a new device hash, or a hit after the idle cutoff, starts a
//! fresh session.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

const IDLE_TIMEOUT_SECS: i64 = 30 * 60;
const MAX_PAGES_TRACKED: usize = 64;

struct SessionEntry {
    session_id: String,
    entered_at: DateTime<Utc>,
    last_touch: DateTime<Utc>,
    hit_count: u32,
    pages: Vec<String>,
}

/// What the tier-2 analyzer needs to emit `_srv_sessionId`,
/// `_srv_sessionHitNum`, `_srv_sessionDurationSec`, `_srv_sessionPages`.
#[derive(Debug, Clone)]
pub struct SessionTouch {
    pub session_id: String,
    pub hit_num: u32,
    pub duration_secs: i64,
    pub page_count: usize,
    pub is_new_session: bool,
}

pub struct SessionRegistry {
    sessions: DashMap<String, SessionEntry>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self { sessions: DashMap::new() }
    }

    /// Record a hit for `device_hash` at path `page`, returning the
    /// session's current state. Starts a new session when the device hash
    /// is unseen or the prior session has been idle past the cutoff.
    pub fn touch(&self, device_hash: &str, page: &str, now: DateTime<Utc>) -> SessionTouch {
        let mut is_new = false;
        let mut entry = self.sessions.entry(device_hash.to_string()).or_insert_with(|| {
            is_new = true;
            SessionEntry {
                session_id: uuid::Uuid::new_v4().to_string(),
                entered_at: now,
                last_touch: now,
                hit_count: 0,
                pages: Vec::new(),
            }
        });

        if !is_new && (now - entry.last_touch).num_seconds() > IDLE_TIMEOUT_SECS {
            entry.session_id = uuid::Uuid::new_v4().to_string();
            entry.entered_at = now;
            entry.hit_count = 0;
            entry.pages.clear();
            is_new = true;
        }

        entry.last_touch = now;
        entry.hit_count += 1;
        if !entry.pages.iter().any(|p| p == page) && entry.pages.len() < MAX_PAGES_TRACKED {
            entry.pages.push(page.to_string());
        }

        SessionTouch {
            session_id: entry.session_id.clone(),
            hit_num: entry.hit_count,
            duration_secs: (now - entry.entered_at).num_seconds(),
            page_count: entry.pages.len(),
            is_new_session: is_new,
        }
    }

    /// Detach sessions idle past the cutoff (spec: "ended sessions are
    /// detached and flushed"). Returns the number removed; the caller may
    /// choose to log the removed session ids for audit purposes.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| (now - entry.last_touch).num_seconds() <= IDLE_TIMEOUT_SECS);
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }
}

pub type SharedSessionRegistry = Arc<SessionRegistry>;
