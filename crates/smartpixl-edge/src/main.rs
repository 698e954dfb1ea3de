use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use smartpixl_edge::config::{EdgeConfig, EdgeConfigArgs};
use smartpixl_edge::state::geo_cache::{spawn_miss_worker, GeoLookupSource, PgGeoLookupSource};
use smartpixl_edge::{http::dispatcher, AppState};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "smartpixl-edge", about = "SmartPiXL edge — HTTP capture and fast enrichment", version)]
struct Args {
    #[arg(long, env = "SMARTPIXL_BIND")]
    bind_address: Option<String>,

    #[arg(long, env = "SMARTPIXL_CONFIG")]
    config: Option<std::path::PathBuf>,

    #[arg(long, env = "SMARTPIXL_QUEUE_CAPACITY")]
    queue_capacity: Option<usize>,

    #[arg(long, env = "SMARTPIXL_PIPE_NAME")]
    pipe_name: Option<String>,

    #[arg(long, env = "SMARTPIXL_FAILOVER_DIRECTORY")]
    failover_directory: Option<String>,

    #[arg(long, env = "SMARTPIXL_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "SMARTPIXL_LOG")]
    log: Option<String>,

    #[arg(long, env = "SMARTPIXL_LOG_FILE")]
    log_file: Option<String>,
}

/// No-op geo source for edge deployments with no `ConnectionString`
/// configured: every lookup misses, same observable behavior as a real
/// store with an empty lookup table.
struct NullGeoLookupSource;

#[async_trait::async_trait]
impl GeoLookupSource for NullGeoLookupSource {
    async fn lookup(&self, _ip: std::net::IpAddr) -> Result<Option<smartpixl_edge::state::geo_cache::GeoResult>> {
        Ok(None)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = args.log.clone().unwrap_or_else(|| "info".to_string());
    let log_file = args.log_file.as_deref().map(std::path::Path::new);
    let _log_guard = smartpixl_core::logging::init(&log_level, log_file)?;

    info!(version = env!("CARGO_PKG_VERSION"), "smartpixl-edge starting");

    let config = Arc::new(EdgeConfig::resolve(EdgeConfigArgs {
        bind_address: args.bind_address,
        config_file: args.config,
        queue_capacity: args.queue_capacity,
        pipe_name: args.pipe_name,
        failover_directory: args.failover_directory,
        base_url: args.base_url,
        log: args.log,
        log_file: args.log_file,
    }));
    info!(
        bind = %config.bind_address,
        queue_capacity = config.queue_capacity,
        pipe = %config.pipe_name,
        "config resolved"
    );

    let state = Arc::new(AppState::build(config.clone()));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let pipe_handle = state.pipe_client.clone().spawn(shutdown_rx.clone());
    let failover_handle = state.failover_writer.clone().spawn(shutdown_rx.clone());

    let geo_source: Arc<dyn GeoLookupSource> = match &config.connection_string {
        Some(conn) => match sqlx::PgPool::connect(conn).await {
            Ok(pool) => Arc::new(PgGeoLookupSource::new(pool)),
            Err(e) => {
                warn!(err = %e, "failed to connect to geo lookup store — geo cache will always miss");
                Arc::new(NullGeoLookupSource)
            }
        },
        None => Arc::new(NullGeoLookupSource),
    };
    let geo_worker_handle = spawn_miss_worker(
        state.enrichment_bank.geo_cache.clone(),
        geo_source,
        shutdown_rx.clone(),
    );

    let trie_refresh_handle = smartpixl_edge::state::datacenter_trie::spawn_refresh_task(
        state.enrichment_bank.datacenter_trie.clone(),
        config.datacenter_cidr_lists.clone(),
        std::time::Duration::from_secs(7 * 24 * 3600),
        shutdown_rx.clone(),
    );

    let sweep_handle = spawn_sweepers(state.clone(), shutdown_rx.clone());

    let app = dispatcher::router(state.clone());
    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address))?;
    info!(bind = %config.bind_address, "listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutdown signal received, draining");
    let _ = shutdown_tx.send(true);

    for handle in [pipe_handle, failover_handle, geo_worker_handle, trie_refresh_handle, sweep_handle] {
        let _ = handle.await;
    }

    info!("smartpixl-edge stopped cleanly");
    Ok(())
}

/// Resolves on SIGTERM or Ctrl-C (Unix); Ctrl-C only elsewhere.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.ok();
    }
}

/// Periodic sweepers for the in-memory fast-enrichment state (spec §9:
/// "require a per-map background sweeper ... do not attempt to synchronize
/// sweeper against hot readers").
fn spawn_sweepers(state: Arc<AppState>, mut shutdown: tokio::sync::watch::Receiver<bool>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = chrono::Utc::now();
                    let fp = state.enrichment_bank.fingerprint_history.sweep(now);
                    let vel = state.enrichment_bank.ip_velocity.sweep(now);
                    let hits = state.enrichment_bank.hit_log.sweep(now);
                    let geo = state.enrichment_bank.geo_cache.sweep_warm();
                    tracing::debug!(fp, vel, hits, geo, "state sweep complete");
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
