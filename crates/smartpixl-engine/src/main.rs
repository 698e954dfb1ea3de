use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use smartpixl_engine::config::{EngineConfig, EngineConfigArgs};
use smartpixl_engine::{http, pipe, pipeline, EngineState};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "smartpixl-engine", about = "SmartPiXL engine — pipeline, bulk writer, ETL trigger", version)]
struct Args {
    #[arg(long, env = "SMARTPIXL_CONNECTION_STRING")]
    connection_string: Option<String>,

    #[arg(long, env = "SMARTPIXL_CONFIG")]
    config: Option<std::path::PathBuf>,

    #[arg(long, env = "SMARTPIXL_QUEUE_CAPACITY")]
    queue_capacity: Option<usize>,

    #[arg(long, env = "SMARTPIXL_BATCH_SIZE")]
    batch_size: Option<usize>,

    #[arg(long, env = "SMARTPIXL_PIPE_NAME")]
    pipe_name: Option<String>,

    #[arg(long, env = "SMARTPIXL_FAILOVER_DIRECTORY")]
    failover_directory: Option<String>,

    #[arg(long, env = "SMARTPIXL_DEAD_LETTER_DIRECTORY")]
    dead_letter_directory: Option<String>,

    #[arg(long, env = "SMARTPIXL_LOG")]
    log: Option<String>,

    #[arg(long, env = "SMARTPIXL_LOG_FILE")]
    log_file: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = args.log.clone().unwrap_or_else(|| "info".to_string());
    let log_file = args.log_file.as_deref().map(std::path::Path::new);
    let _log_guard = smartpixl_core::logging::init(&log_level, log_file)?;

    info!(version = env!("CARGO_PKG_VERSION"), "smartpixl-engine starting");

    let config = Arc::new(EngineConfig::resolve(EngineConfigArgs {
        connection_string: args.connection_string,
        config_file: args.config,
        queue_capacity: args.queue_capacity,
        batch_size: args.batch_size,
        pipe_name: args.pipe_name,
        failover_directory: args.failover_directory,
        dead_letter_directory: args.dead_letter_directory,
        log: args.log,
        log_file: args.log_file,
    }));
    info!(
        pipe = %config.pipe_name.display(),
        queue_capacity = config.queue_capacity,
        batch_size = config.batch_size,
        "config resolved"
    );

    let pool = if config.connection_string.is_empty() {
        warn!("no connection string configured — bulk writer will dead-letter every batch");
        None
    } else {
        match sqlx::PgPool::connect(&config.connection_string).await {
            Ok(pool) => Some(pool),
            Err(e) => {
                warn!(err = %e, "failed to connect to the store — bulk writer will dead-letter every batch");
                None
            }
        }
    };

    let state = Arc::new(EngineState::build(config.clone(), pool.clone()).await);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let accept_handle = pipe::server::spawn_accept_loop(config.pipe_name.clone(), state.ingest_queue.clone(), shutdown_rx.clone());
    let catchup_handle = pipe::catchup::spawn(
        config.failover_directory.clone(),
        state.ingest_queue.clone(),
        Duration::from_secs(config.catchup_interval_secs),
        shutdown_rx.clone(),
    );
    let pipeline_handle = pipeline::spawn_consumer(
        state.pipeline.clone(),
        state.ingest_queue.clone(),
        state.write_queue.clone(),
        shutdown_rx.clone(),
    );
    let writer_handle = state
        .writer
        .spawn(shutdown_rx.clone(), Duration::from_secs(config.shutdown_timeout_secs))
        .await;
    let etl_handle = smartpixl_engine::etl::spawn(pool, Duration::from_secs(config.etl_interval_secs), shutdown_rx.clone());
    let sweep_handle = spawn_sweepers(state.clone(), shutdown_rx.clone());

    let internal_app = http::internal::router(state.clone());
    let internal_listener = tokio::net::TcpListener::bind(&config.internal_bind_address).await?;
    info!(bind = %config.internal_bind_address, "internal http listening");
    let internal_server = tokio::spawn(
        axum::serve(internal_listener, internal_app.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(shutdown_signal_follower(shutdown_rx.clone())),
    );

    shutdown_signal().await;
    info!("shutdown signal received, draining");
    let _ = shutdown_tx.send(true);

    let _ = internal_server.await;
    for handle in [accept_handle_ignore(accept_handle), catchup_handle, pipeline_handle, writer_handle, etl_handle, sweep_handle] {
        let _ = handle.await;
    }

    info!("smartpixl-engine stopped cleanly");
    Ok(())
}

/// `spawn_accept_loop` returns `anyhow::Result<()>` from its join handle;
/// normalize it alongside the other `()`-returning handles so they can
/// share one awaiting loop below.
fn accept_handle_ignore(handle: tokio::task::JoinHandle<anyhow::Result<()>>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = handle.await {
            tracing::warn!(err = %e, "pipe accept loop task panicked");
        }
    })
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

/// Lets `axum::serve`'s graceful-shutdown future resolve off the same
/// `watch` channel the rest of the process drains against, instead of a
/// second independent signal listener racing the first.
async fn shutdown_signal_follower(mut shutdown: tokio::sync::watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Periodic sweepers for the cross-request state maps (spec §9: sweep
/// each map on its own schedule, never synchronized against hot readers).
fn spawn_sweepers(state: Arc<EngineState>, mut shutdown: tokio::sync::watch::Receiver<bool>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = chrono::Utc::now();
                    let witness = state.witness.sweep(now);
                    let sessions = state.sessions.sweep(now);
                    let replay = state.replay_index.sweep(now);
                    let rollup = state.company_rollup.sweep(now);
                    tracing::debug!(witness, sessions, replay, rollup, "state sweep complete");
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
