//! Per-IP fingerprint observation history (spec §3.2, §4.2 analyzer 2).
//!
//! Grounded in the teacher's concurrent registries (`AccountRegistry`,
//! `RepoRegistry`) which wrap a `dashmap::DashMap` behind a small typed
//! API rather than exposing the map directly — callers never lock a
//! specific bucket themselves.

use std::collections::VecDeque;
use std::net::IpAddr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

const MAX_RECENT_TOUCHES: usize = 64;

struct FpState {
    first_seen: DateTime<Utc>,
    last_seen: DateTime<Utc>,
    observation_count: u64,
    /// Distinct composite fingerprints seen from this IP, each with its
    /// own last-touch time so stale composites drop out of the 24h window
    /// without evicting the whole per-IP entry.
    composites: Vec<(String, DateTime<Utc>)>,
    recent_touches: VecDeque<DateTime<Utc>>,
}

/// Result of recording one observation, feeding directly into the
/// `_srv_fp*` enrichment pairs.
#[derive(Debug, Clone, Copy)]
pub struct FingerprintObservation {
    pub distinct_composites_24h: usize,
    pub observation_count: u64,
    pub rate_per_5m: usize,
}

pub struct FingerprintHistory {
    map: DashMap<IpAddr, FpState>,
    ttl: Duration,
}

impl FingerprintHistory {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            map: DashMap::new(),
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    /// Record one fingerprint observation from `ip` at `now`, returning the
    /// rolled-up stats the fingerprint-stability analyzer needs.
    pub fn observe(&self, ip: IpAddr, composite: &str, now: DateTime<Utc>) -> FingerprintObservation {
        let mut entry = self.map.entry(ip).or_insert_with(|| FpState {
            first_seen: now,
            last_seen: now,
            observation_count: 0,
            composites: Vec::new(),
            recent_touches: VecDeque::with_capacity(MAX_RECENT_TOUCHES),
        });

        entry.last_seen = now;
        entry.observation_count += 1;

        let ttl_chrono = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::hours(24));
        entry.composites.retain(|(_, seen)| now - *seen <= ttl_chrono);
        match entry.composites.iter_mut().find(|(fp, _)| fp == composite) {
            Some(slot) => slot.1 = now,
            None => entry.composites.push((composite.to_string(), now)),
        }

        entry.recent_touches.push_back(now);
        while entry.recent_touches.len() > MAX_RECENT_TOUCHES {
            entry.recent_touches.pop_front();
        }
        let five_min_ago = now - chrono::Duration::minutes(5);
        let rate_per_5m = entry
            .recent_touches
            .iter()
            .filter(|t| **t >= five_min_ago)
            .count();

        FingerprintObservation {
            distinct_composites_24h: entry.composites.len(),
            observation_count: entry.observation_count,
            rate_per_5m,
        }
    }

    /// Evict IPs whose entry has not been touched within `ttl` of `now`.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let ttl_chrono = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::hours(24));
        let before = self.map.len();
        self.map.retain(|_, state| now - state.last_seen <= ttl_chrono);
        before - self.map.len()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
