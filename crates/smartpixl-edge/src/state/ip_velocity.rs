//! Per-/24-subnet IP velocity witness (spec §3.2, §4.2 analyzer 3's subnet
//! half). Tracks how many distinct source IPs have been observed from one
//! IPv4 /24 in a 5-minute window.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// The first three octets of an IPv4 address, used as the subnet key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subnet24(u8, u8, u8);

impl Subnet24 {
    pub fn of(addr: Ipv4Addr) -> Self {
        let o = addr.octets();
        Self(o[0], o[1], o[2])
    }
}

struct SubnetState {
    /// Last-seen time per distinct IP observed in this subnet.
    ips: Mutex<HashMap<Ipv4Addr, DateTime<Utc>>>,
    /// Every hit's timestamp in this subnet, independent of `ips` — a
    /// repeat hit from the same IP only touches `ips`' value, not its
    /// length, so total hit volume needs its own windowed record.
    hits: Mutex<Vec<DateTime<Utc>>>,
}

pub struct SubnetVelocityResult {
    pub distinct_ips_5m: usize,
    pub total_hits_5m: usize,
}

pub struct IpVelocity {
    map: DashMap<Subnet24, SubnetState>,
    window: chrono::Duration,
}

impl IpVelocity {
    pub fn new(window_secs: u64) -> Self {
        Self {
            map: DashMap::new(),
            window: chrono::Duration::from_std(std::time::Duration::from_secs(window_secs))
                .unwrap_or(chrono::Duration::minutes(5)),
        }
    }

    /// Only IPv4 addresses are subject to subnet velocity tracking; IPv6
    /// callers get a zeroed result (spec §3.2 scopes this to IPv4 /24s).
    pub fn observe(&self, ip: IpAddr, now: DateTime<Utc>) -> SubnetVelocityResult {
        let v4 = match ip {
            IpAddr::V4(v4) => v4,
            IpAddr::V6(_) => {
                return SubnetVelocityResult {
                    distinct_ips_5m: 0,
                    total_hits_5m: 0,
                }
            }
        };
        let subnet = Subnet24::of(v4);
        let entry = self.map.entry(subnet).or_insert_with(|| SubnetState {
            ips: Mutex::new(HashMap::new()),
            hits: Mutex::new(Vec::new()),
        });

        let mut ips = entry.ips.lock().expect("subnet mutex poisoned");
        ips.retain(|_, last_seen| now - *last_seen <= self.window);
        ips.insert(v4, now);
        let distinct_ips_5m = ips.len();
        drop(ips);

        let mut hits = entry.hits.lock().expect("subnet hits mutex poisoned");
        hits.retain(|seen| now - *seen <= self.window);
        hits.push(now);
        let total_hits_5m = hits.len();

        SubnetVelocityResult {
            distinct_ips_5m,
            total_hits_5m,
        }
    }

    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let before = self.map.len();
        self.map.retain(|_, state| {
            let mut ips = state.ips.lock().expect("subnet mutex poisoned");
            ips.retain(|_, last_seen| now - *last_seen <= self.window);
            let mut hits = state.hits.lock().expect("subnet hits mutex poisoned");
            hits.retain(|seen| now - *seen <= self.window);
            !ips.is_empty() || !hits.is_empty()
        });
        before - self.map.len()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }
}
