//! `tracing` subscriber setup shared by both processes.
//!
//! Grounded directly on the teacher's `setup_logging` (`daemon/src/main.rs`):
//! an `EnvFilter` built from a level string, a compact stdout layer always
//! present, and an optional non-blocking rolling-file layer when a log path
//! is configured. A bad log path degrades to stdout-only rather than
//! failing, the same as the teacher; the `Result` return is only for the
//! genuinely fatal case of a subscriber already being installed.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Holds the non-blocking file appender's worker guard, if any. Dropping
/// this flushes pending log lines; callers must keep it alive for the
/// lifetime of `main`.
pub struct LoggingGuard(#[allow(dead_code)] Option<WorkerGuard>);

/// Initialize the global `tracing` subscriber.
///
/// `log_level` is an `EnvFilter` directive string (e.g. `"info"`,
/// `"smartpixl_edge=debug,info"`). When `log_file` is set, JSON lines are
/// also written to a daily-rolled file at that path in addition to the
/// compact stdout layer (spec SPEC_FULL §1: "structured logging via
/// tracing, regardless of which feature Non-goals exclude").
///
/// A bad `log_file` path (unwritable directory, permission denied) falls
/// back to a stdout-only subscriber rather than failing startup, matching
/// the teacher's `setup_logging` — a misconfigured log path is not a
/// reason to refuse to serve traffic.
pub fn init(log_level: &str, log_file: Option<&Path>) -> anyhow::Result<LoggingGuard> {
    fn filter(log_level: &str) -> tracing_subscriber::EnvFilter {
        tracing_subscriber::EnvFilter::try_new(log_level)
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    }

    fn init_stdout_only(log_level: &str) -> anyhow::Result<LoggingGuard> {
        tracing_subscriber::registry()
            .with(filter(log_level))
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;
        Ok(LoggingGuard(None))
    }

    let Some(path) = log_file else {
        return init_stdout_only(log_level);
    };

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let filename = path
        .file_name()
        .unwrap_or_else(|| std::ffi::OsStr::new("smartpixl.log"));

    if let Err(e) = std::fs::create_dir_all(dir) {
        eprintln!("logging: could not create log directory {}: {e} — falling back to stdout-only logging", dir.display());
        return init_stdout_only(log_level);
    }

    let appender = tracing_appender::rolling::daily(dir, filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    let installed = tracing_subscriber::registry()
        .with(filter(log_level))
        .with(tracing_subscriber::fmt::layer().compact())
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking),
        )
        .try_init();

    match installed {
        Ok(()) => Ok(LoggingGuard(Some(guard))),
        Err(e) => {
            eprintln!("logging: failed to install file-backed subscriber: {e} — falling back to stdout-only logging");
            init_stdout_only(log_level)
        }
    }
}
