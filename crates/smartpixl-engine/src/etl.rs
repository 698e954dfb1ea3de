//! ETL trigger (spec §4.8): every 60 seconds, call the opaque parse and
//! identity-match store procedures that turn raw query-string payloads
//! into first-class columns downstream. Ticks never overlap — if a run is
//! still in flight when the next tick arrives, that tick is skipped
//! rather than queued, so a slow run never builds a backlog of callers.
//!
//! Grounded in `pipe::catchup::spawn`'s `tokio::time::interval` +
//! `tokio::select!` shutdown pattern, with the overlap-coalescing guard
//! added on top since a store procedure call (unlike a failover sweep) can
//! run long enough to overlap its own next tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

/// One ETL pass: invoke the parse procedure, then the identity-match
/// procedure. Both are opaque stored procedures on the target database
/// (spec §4.8); this process's job is only to call them on schedule and
/// log the outcome, not to know what they do internally.
async fn run_once(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::query("CALL sp_parse_pending_hits()").execute(pool).await?;
    sqlx::query("CALL sp_identity_match()").execute(pool).await?;
    Ok(())
}

/// Spawn the periodic trigger. A `None` pool means ETL is disabled
/// (matches the bulk writer's degrade-gracefully posture when no
/// connection string is configured) — the task exits immediately.
pub fn spawn(
    pool: Option<sqlx::PgPool>,
    interval: Duration,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let Some(pool) = pool else {
            tracing::info!("etl trigger: no connection string configured, disabled");
            return;
        };

        let running = Arc::new(Mutex::new(()));
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let Ok(_guard) = running.clone().try_lock_owned() else {
                        tracing::warn!("etl trigger: previous run still in flight, skipping this tick");
                        continue;
                    };
                    let pool = pool.clone();
                    tokio::spawn(async move {
                        let _guard = _guard;
                        let started = tokio::time::Instant::now();
                        match run_once(&pool).await {
                            Ok(()) => tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, "etl trigger: run completed"),
                            Err(e) => tracing::error!(err = %e, "etl trigger: run failed"),
                        }
                    });
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
