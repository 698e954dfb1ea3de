//! Analyzer 3 — IP velocity (spec §4.2.3): subnet /24 witness plus
//! per-IP rapid-fire / sub-second-duplicate detection.

use std::net::IpAddr;

use chrono::{DateTime, Utc};

use crate::state::hit_log::HitLog;
use crate::state::ip_velocity::IpVelocity;

const SUBNET_DISTINCT_IP_THRESHOLD: usize = 3;

pub fn analyze(
    ip_velocity: &IpVelocity,
    hit_log: &HitLog,
    ip: IpAddr,
    now: DateTime<Utc>,
    pairs: &mut Vec<(&'static str, String)>,
) {
    let subnet = ip_velocity.observe(ip, now);
    let hits = hit_log.observe(ip, now);

    if subnet.distinct_ips_5m >= SUBNET_DISTINCT_IP_THRESHOLD {
        pairs.push(("subnetAlert", "1".to_string()));
        pairs.push(("subnetIps", subnet.distinct_ips_5m.to_string()));
        pairs.push(("subnetHits", subnet.total_hits_5m.to_string()));
    }

    if hits.rapid_fire {
        pairs.push(("rapidFire", "1".to_string()));
        pairs.push(("hitsIn15s", hits.hits_in_15s.to_string()));
    }

    if hits.sub_second_dupe {
        pairs.push(("subSecDupe", "1".to_string()));
    }

    if let Some(gap) = hits.last_gap_ms {
        pairs.push(("lastGapMs", gap.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_hit_from_new_ip_fires_nothing() {
        let velocity = IpVelocity::new(300);
        let hit_log = HitLog::new();
        let mut pairs = Vec::new();
        analyze(&velocity, &hit_log, "203.0.113.9".parse().unwrap(), Utc::now(), &mut pairs);
        assert!(pairs.is_empty());
    }

    #[test]
    fn three_distinct_subnet_ips_trigger_subnet_alert() {
        let velocity = IpVelocity::new(300);
        let hit_log = HitLog::new();
        let now = Utc::now();
        let mut pairs = Vec::new();
        analyze(&velocity, &hit_log, "203.0.113.1".parse().unwrap(), now, &mut pairs);
        pairs.clear();
        analyze(&velocity, &hit_log, "203.0.113.2".parse().unwrap(), now, &mut pairs);
        pairs.clear();
        analyze(&velocity, &hit_log, "203.0.113.3".parse().unwrap(), now, &mut pairs);
        assert!(pairs.iter().any(|(k, v)| *k == "subnetAlert" && v == "1"));
    }

    #[test]
    fn rapid_successive_hits_trigger_rapid_fire_and_gap() {
        let velocity = IpVelocity::new(300);
        let hit_log = HitLog::new();
        let ip = "198.51.100.7".parse().unwrap();
        let now = Utc::now();
        let mut pairs = Vec::new();
        analyze(&velocity, &hit_log, ip, now, &mut pairs);
        pairs.clear();
        analyze(&velocity, &hit_log, ip, now + chrono::Duration::milliseconds(100), &mut pairs);
        assert!(pairs.iter().any(|(k, _)| *k == "rapidFire"));
        assert!(pairs.iter().any(|(k, _)| *k == "subSecDupe"));
        assert!(pairs.iter().any(|(k, _)| *k == "lastGapMs"));
    }
}
