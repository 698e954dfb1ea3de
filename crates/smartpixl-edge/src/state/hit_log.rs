//! Per-IP hit timestamp ring (spec §3.2 "per-IP hit timestamps", §4.2
//! analyzer 3's rapid-fire / sub-second-duplicate half).

use std::collections::VecDeque;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

const MAX_TRACKED_HITS: usize = 32;
const RAPID_FIRE_WINDOW_SECS: i64 = 15;
const RAPID_FIRE_MIN_HITS: usize = 2;
const SUB_SECOND_MS: i64 = 1_000;

#[derive(Debug, Clone, Copy, Default)]
pub struct HitLogResult {
    pub rapid_fire: bool,
    pub sub_second_dupe: bool,
    pub hits_in_15s: usize,
    pub last_gap_ms: Option<i64>,
}

pub struct HitLog {
    map: DashMap<IpAddr, VecDeque<DateTime<Utc>>>,
}

impl HitLog {
    pub fn new() -> Self {
        Self { map: DashMap::new() }
    }

    pub fn observe(&self, ip: IpAddr, now: DateTime<Utc>) -> HitLogResult {
        let mut entry = self.map.entry(ip).or_insert_with(VecDeque::new);

        let last_gap_ms = entry.back().map(|prev| (now - *prev).num_milliseconds());

        entry.push_back(now);
        while entry.len() > MAX_TRACKED_HITS {
            entry.pop_front();
        }

        let window_start = now - chrono::Duration::seconds(RAPID_FIRE_WINDOW_SECS);
        let hits_in_15s = entry.iter().filter(|t| **t >= window_start).count();

        HitLogResult {
            rapid_fire: hits_in_15s >= RAPID_FIRE_MIN_HITS,
            sub_second_dupe: last_gap_ms.map(|gap| gap < SUB_SECOND_MS).unwrap_or(false),
            hits_in_15s,
            last_gap_ms,
        }
    }

    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - chrono::Duration::seconds(RAPID_FIRE_WINDOW_SECS * 4);
        let before = self.map.len();
        self.map.retain(|_, hits| hits.back().map(|t| *t >= cutoff).unwrap_or(false));
        before - self.map.len()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }
}

impl Default for HitLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip() -> IpAddr {
        "198.51.100.7".parse().unwrap()
    }

    #[test]
    fn single_hit_is_not_rapid_fire() {
        let log = HitLog::new();
        let result = log.observe(ip(), Utc::now());
        assert!(!result.rapid_fire);
        assert!(!result.sub_second_dupe);
        assert_eq!(result.last_gap_ms, None);
    }

    #[test]
    fn four_hits_100ms_apart_trigger_rapid_fire_and_subsecond() {
        let log = HitLog::new();
        let mut now = Utc::now();
        log.observe(ip(), now);
        for _ in 0..3 {
            now += chrono::Duration::milliseconds(100);
            let result = log.observe(ip(), now);
            assert!(result.rapid_fire);
            assert!(result.sub_second_dupe);
            assert!(result.last_gap_ms.unwrap() >= 50 && result.last_gap_ms.unwrap() <= 200);
        }
    }

    #[test]
    fn hits_far_apart_do_not_trigger_rapid_fire() {
        let log = HitLog::new();
        let now = Utc::now();
        log.observe(ip(), now);
        let result = log.observe(ip(), now + chrono::Duration::seconds(30));
        assert!(!result.rapid_fire);
        assert!(!result.sub_second_dupe);
    }

    #[test]
    fn ring_is_bounded_to_max_tracked_hits() {
        let log = HitLog::new();
        let mut now = Utc::now();
        for _ in 0..(MAX_TRACKED_HITS + 10) {
            now += chrono::Duration::seconds(1);
            log.observe(ip(), now);
        }
        let entry = log.map.get(&ip()).unwrap();
        assert_eq!(entry.len(), MAX_TRACKED_HITS);
    }
}
