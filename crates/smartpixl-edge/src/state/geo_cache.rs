//! Two-tier geo cache (spec §3.2): a hot process-wide map and a
//! sliding-expiry warm tier, with a non-blocking miss path that hands the
//! IP to a single background worker querying the relational geo lookup
//! table. "First hit for a new IP returns not found" (spec §9 Open
//! Question, resolved as documented: not blocking keeps the edge's
//! no-synchronous-I/O invariant intact).

use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use smartpixl_core::queue::DropOldestQueue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoResult {
    pub country_code: String,
    pub region: String,
    pub city: String,
    pub timezone: Option<String>,
    pub isp: String,
    pub is_proxy: bool,
    pub is_mobile: bool,
}

/// Looks up geo data for a miss. The only real implementation queries the
/// relational store's geo lookup table; tests use an in-memory fake.
#[async_trait]
pub trait GeoLookupSource: Send + Sync {
    async fn lookup(&self, ip: IpAddr) -> anyhow::Result<Option<GeoResult>>;
}

/// Queries a `geo_lookup` table keyed by CIDR or exact IP (spec §3.4:
/// "a few lookup tables", opaque to the core beyond this one read path).
pub struct PgGeoLookupSource {
    pool: sqlx::PgPool,
}

impl PgGeoLookupSource {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GeoLookupSource for PgGeoLookupSource {
    async fn lookup(&self, ip: IpAddr) -> anyhow::Result<Option<GeoResult>> {
        let row = sqlx::query_as::<_, (String, String, String, Option<String>, String, bool, bool)>(
            "SELECT country_code, region, city, timezone, isp, is_proxy, is_mobile \
             FROM geo_lookup WHERE network >>= $1::inet LIMIT 1",
        )
        .bind(ip.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(country_code, region, city, timezone, isp, is_proxy, is_mobile)| GeoResult {
                country_code,
                region,
                city,
                timezone,
                isp,
                is_proxy,
                is_mobile,
            },
        ))
    }
}

struct WarmEntry {
    result: GeoResult,
    inserted_at: Instant,
}

pub struct GeoCache {
    hot: DashMap<IpAddr, GeoResult>,
    warm: DashMap<IpAddr, WarmEntry>,
    warm_ttl: Duration,
    miss_queue: Arc<DropOldestQueue<IpAddr>>,
}

impl GeoCache {
    pub fn new(warm_ttl_secs: u64, miss_queue_capacity: usize) -> Self {
        Self {
            hot: DashMap::new(),
            warm: DashMap::new(),
            warm_ttl: Duration::from_secs(warm_ttl_secs),
            miss_queue: Arc::new(DropOldestQueue::new(miss_queue_capacity)),
        }
    }

    pub fn miss_queue(&self) -> Arc<DropOldestQueue<IpAddr>> {
        self.miss_queue.clone()
    }

    /// Look up `ip`. On a full miss (absent from both tiers), the IP is
    /// enqueued for background lookup and `None` is returned immediately —
    /// this never does I/O inline on the request path.
    pub fn get(&self, ip: IpAddr) -> Option<GeoResult> {
        if let Some(hit) = self.hot.get(&ip) {
            return Some(hit.clone());
        }
        if let Some(warm) = self.warm.get(&ip) {
            if warm.inserted_at.elapsed() <= self.warm_ttl {
                return Some(warm.result.clone());
            }
        }
        self.miss_queue.push(ip);
        None
    }

    /// Populate both tiers after a background lookup resolves (possibly to
    /// "not found", which this cache does not persist — a later lookup will
    /// simply re-enqueue).
    pub fn populate(&self, ip: IpAddr, result: GeoResult) {
        self.hot.insert(ip, result.clone());
        self.warm.insert(
            ip,
            WarmEntry {
                result,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn sweep_warm(&self) -> usize {
        let before = self.warm.len();
        self.warm.retain(|_, entry| entry.inserted_at.elapsed() <= self.warm_ttl);
        before - self.warm.len()
    }
}

/// Spawn the single background worker draining the miss queue against
/// `source` (spec §5: "geo-cache miss worker is a single consumer of the
/// miss queue").
pub fn spawn_miss_worker(
    cache: Arc<GeoCache>,
    source: Arc<dyn GeoLookupSource>,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    let queue = cache.miss_queue();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                ip = queue.pop() => {
                    match source.lookup(ip).await {
                        Ok(Some(result)) => cache.populate(ip, result),
                        Ok(None) => tracing::debug!(%ip, "geo lookup: not found"),
                        Err(e) => tracing::warn!(%ip, err = %e, "geo lookup failed"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    })
}
