//! Edge process configuration (spec §6.3), resolved CLI/env > TOML > default,
//! following the teacher's `DaemonConfig::new` priority (`daemon/src/config/mod.rs`).

use std::net::IpAddr;
use std::path::PathBuf;

use serde::Deserialize;
use smartpixl_core::config::{load_toml_file, resolve, resolve_env};

const DEFAULT_BIND: &str = "0.0.0.0:8080";
const DEFAULT_QUEUE_CAPACITY: usize = 10_000;
const DEFAULT_PIPE_NAME: &str = "SmartPiXL-Enrichment";
const DEFAULT_FAILOVER_DIR: &str = "./data/failover";
const DEFAULT_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_GEO_CACHE_WARM_SECS: u64 = 3_600;
const DEFAULT_FP_HISTORY_TTL_SECS: u64 = 24 * 3_600;
const DEFAULT_SUBNET_WITNESS_TTL_SECS: u64 = 5 * 60;

/// `{config file}` — every field optional, mirrors `TomlConfig` in the teacher.
#[derive(Debug, Default, Deserialize)]
pub struct TomlEdgeConfig {
    pub bind_address: Option<String>,
    pub queue_capacity: Option<usize>,
    pub pipe_name: Option<String>,
    pub failover_directory: Option<String>,
    pub dashboard_allowed_ips: Option<Vec<String>>,
    pub base_url: Option<String>,
    pub log: Option<String>,
    pub log_file: Option<String>,
    pub datacenter_cidr_lists: Option<Vec<String>>,
    pub geo_db_path: Option<String>,
    pub connection_string: Option<String>,
}

/// Resolved edge configuration, used throughout `smartpixl-edge` as an
/// `Arc<EdgeConfig>` alongside the rest of the shared application state.
#[derive(Debug, Clone)]
pub struct EdgeConfig {
    pub bind_address: String,
    pub queue_capacity: usize,
    pub pipe_name: String,
    pub failover_directory: PathBuf,
    pub dashboard_allowed_ips: Vec<IpAddr>,
    pub base_url: String,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    /// Paths to CIDR list files for the datacenter trie (spec §3.2: "two
    /// weekly-refreshed lists" — generalized to N configured lists).
    pub datacenter_cidr_lists: Vec<PathBuf>,
    /// Optional MaxMind-format database used only as a local geo fallback
    /// on the edge; the engine's tier-1 offline geo is the primary user.
    pub geo_db_path: Option<PathBuf>,
    /// Relational-store endpoint for the geo miss-worker's lookup table
    /// (spec §3.2, §6.3 `ConnectionString`). `None` means the edge runs
    /// without geo enrichment (every lookup misses).
    pub connection_string: Option<String>,
    pub geo_cache_warm_ttl_secs: u64,
    pub fingerprint_history_ttl_secs: u64,
    pub subnet_witness_ttl_secs: u64,
}

#[allow(clippy::too_many_arguments)]
pub struct EdgeConfigArgs {
    pub bind_address: Option<String>,
    pub config_file: Option<PathBuf>,
    pub queue_capacity: Option<usize>,
    pub pipe_name: Option<String>,
    pub failover_directory: Option<String>,
    pub base_url: Option<String>,
    pub log: Option<String>,
    pub log_file: Option<String>,
}

impl EdgeConfig {
    pub fn resolve(args: EdgeConfigArgs) -> Self {
        let toml = args
            .config_file
            .as_deref()
            .and_then(load_toml_file::<TomlEdgeConfig>)
            .unwrap_or_default();

        let dashboard_allowed_ips = toml
            .dashboard_allowed_ips
            .unwrap_or_default()
            .iter()
            .filter_map(|s| s.parse::<IpAddr>().ok())
            .collect();

        Self {
            bind_address: resolve(args.bind_address, toml.bind_address, DEFAULT_BIND.to_string()),
            queue_capacity: resolve(
                args.queue_capacity,
                toml.queue_capacity,
                DEFAULT_QUEUE_CAPACITY,
            ),
            pipe_name: resolve(args.pipe_name, toml.pipe_name, DEFAULT_PIPE_NAME.to_string()),
            failover_directory: PathBuf::from(resolve(
                args.failover_directory,
                toml.failover_directory,
                DEFAULT_FAILOVER_DIR.to_string(),
            )),
            dashboard_allowed_ips,
            base_url: resolve_env(
                "SMARTPIXL_BASE_URL",
                args.base_url.or(toml.base_url),
                DEFAULT_BASE_URL,
            ),
            log_level: resolve(args.log, toml.log, DEFAULT_LOG_LEVEL.to_string()),
            log_file: args
                .log_file
                .or(toml.log_file)
                .map(PathBuf::from),
            datacenter_cidr_lists: toml
                .datacenter_cidr_lists
                .unwrap_or_default()
                .into_iter()
                .map(PathBuf::from)
                .collect(),
            geo_db_path: toml.geo_db_path.map(PathBuf::from),
            connection_string: std::env::var("SMARTPIXL_CONNECTION_STRING")
                .ok()
                .filter(|v| !v.is_empty())
                .or(toml.connection_string),
            geo_cache_warm_ttl_secs: DEFAULT_GEO_CACHE_WARM_SECS,
            fingerprint_history_ttl_secs: DEFAULT_FP_HISTORY_TTL_SECS,
            subnet_witness_ttl_secs: DEFAULT_SUBNET_WITNESS_TTL_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_args() -> EdgeConfigArgs {
        EdgeConfigArgs {
            bind_address: None,
            config_file: None,
            queue_capacity: None,
            pipe_name: None,
            failover_directory: None,
            base_url: None,
            log: None,
            log_file: None,
        }
    }

    #[test]
    fn defaults_apply_with_no_args_or_toml() {
        let cfg = EdgeConfig::resolve(empty_args());
        assert_eq!(cfg.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert_eq!(cfg.pipe_name, DEFAULT_PIPE_NAME);
    }

    #[test]
    fn cli_arg_overrides_default() {
        let mut args = empty_args();
        args.queue_capacity = Some(500);
        let cfg = EdgeConfig::resolve(args);
        assert_eq!(cfg.queue_capacity, 500);
    }
}
