//! Engine process configuration (spec §6.3), resolved CLI/env > TOML >
//! default, the same three-tier priority `smartpixl-edge::config` uses.

use std::path::PathBuf;

use serde::Deserialize;
use smartpixl_core::config::{load_toml_file, resolve, resolve_env};

const DEFAULT_QUEUE_CAPACITY: usize = 10_000;
const DEFAULT_BATCH_SIZE: usize = 100;
const DEFAULT_BULK_COPY_TIMEOUT_SECS: u64 = 60;
const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PIPE_NAME: &str = "SmartPiXL-Enrichment";
const DEFAULT_FAILOVER_DIR: &str = "./data/failover";
const DEFAULT_DEAD_LETTER_DIR: &str = "./data/deadletter";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_CATCHUP_INTERVAL_SECS: u64 = 30;
const DEFAULT_ETL_INTERVAL_SECS: u64 = 60;
const DEFAULT_ONLINE_GEO_RPS: u32 = 5;
const DEFAULT_RDNS_TIMEOUT_SECS: u64 = 2;
const DEFAULT_INTERNAL_BIND_ADDRESS: &str = "127.0.0.1:9191";

#[derive(Debug, Default, Deserialize)]
pub struct TomlEngineConfig {
    pub connection_string: Option<String>,
    pub queue_capacity: Option<usize>,
    pub batch_size: Option<usize>,
    pub bulk_copy_timeout_seconds: Option<u64>,
    pub shutdown_timeout_seconds: Option<u64>,
    pub pipe_name: Option<String>,
    pub failover_directory: Option<String>,
    pub dead_letter_directory: Option<String>,
    pub dashboard_allowed_ips: Option<Vec<String>>,
    pub log: Option<String>,
    pub log_file: Option<String>,
    pub offline_geo_db_path: Option<String>,
    pub offline_asn_db_path: Option<String>,
    pub online_geo_endpoint: Option<String>,
    pub online_geo_requests_per_second: Option<u32>,
    pub whois_endpoint: Option<String>,
    pub catchup_interval_seconds: Option<u64>,
    pub etl_interval_seconds: Option<u64>,
    pub internal_bind_address: Option<String>,
}

/// Resolved engine configuration, shared as `Arc<EngineConfig>`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub connection_string: String,
    pub queue_capacity: usize,
    pub batch_size: usize,
    pub bulk_copy_timeout_secs: u64,
    pub shutdown_timeout_secs: u64,
    pub pipe_name: PathBuf,
    pub failover_directory: PathBuf,
    pub dead_letter_directory: PathBuf,
    pub dashboard_allowed_ips: Vec<std::net::IpAddr>,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub offline_geo_db_path: Option<PathBuf>,
    pub offline_asn_db_path: Option<PathBuf>,
    pub online_geo_endpoint: Option<String>,
    pub online_geo_requests_per_second: u32,
    pub whois_endpoint: Option<String>,
    pub rdns_timeout_secs: u64,
    pub catchup_interval_secs: u64,
    pub etl_interval_secs: u64,
    pub internal_bind_address: String,
}

pub struct EngineConfigArgs {
    pub connection_string: Option<String>,
    pub config_file: Option<PathBuf>,
    pub queue_capacity: Option<usize>,
    pub batch_size: Option<usize>,
    pub pipe_name: Option<String>,
    pub failover_directory: Option<String>,
    pub dead_letter_directory: Option<String>,
    pub log: Option<String>,
    pub log_file: Option<String>,
}

impl EngineConfig {
    pub fn resolve(args: EngineConfigArgs) -> Self {
        let toml = args
            .config_file
            .as_deref()
            .and_then(load_toml_file::<TomlEngineConfig>)
            .unwrap_or_default();

        let dashboard_allowed_ips = toml
            .dashboard_allowed_ips
            .unwrap_or_default()
            .iter()
            .filter_map(|s| s.parse::<std::net::IpAddr>().ok())
            .collect();

        Self {
            connection_string: resolve_env(
                "SMARTPIXL_CONNECTION_STRING",
                args.connection_string.or(toml.connection_string),
                "",
            ),
            queue_capacity: resolve(args.queue_capacity, toml.queue_capacity, DEFAULT_QUEUE_CAPACITY),
            batch_size: resolve(args.batch_size, toml.batch_size, DEFAULT_BATCH_SIZE),
            bulk_copy_timeout_secs: toml
                .bulk_copy_timeout_seconds
                .unwrap_or(DEFAULT_BULK_COPY_TIMEOUT_SECS),
            shutdown_timeout_secs: toml
                .shutdown_timeout_seconds
                .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            pipe_name: PathBuf::from(resolve(args.pipe_name, toml.pipe_name, DEFAULT_PIPE_NAME.to_string())),
            failover_directory: PathBuf::from(resolve(
                args.failover_directory,
                toml.failover_directory,
                DEFAULT_FAILOVER_DIR.to_string(),
            )),
            dead_letter_directory: PathBuf::from(resolve(
                args.dead_letter_directory,
                toml.dead_letter_directory,
                DEFAULT_DEAD_LETTER_DIR.to_string(),
            )),
            dashboard_allowed_ips,
            log_level: resolve(args.log, toml.log, DEFAULT_LOG_LEVEL.to_string()),
            log_file: args.log_file.or(toml.log_file).map(PathBuf::from),
            offline_geo_db_path: toml.offline_geo_db_path.map(PathBuf::from),
            offline_asn_db_path: toml.offline_asn_db_path.map(PathBuf::from),
            online_geo_endpoint: toml.online_geo_endpoint,
            online_geo_requests_per_second: toml
                .online_geo_requests_per_second
                .unwrap_or(DEFAULT_ONLINE_GEO_RPS),
            whois_endpoint: toml.whois_endpoint,
            rdns_timeout_secs: DEFAULT_RDNS_TIMEOUT_SECS,
            catchup_interval_secs: toml.catchup_interval_seconds.unwrap_or(DEFAULT_CATCHUP_INTERVAL_SECS),
            etl_interval_secs: toml.etl_interval_seconds.unwrap_or(DEFAULT_ETL_INTERVAL_SECS),
            internal_bind_address: toml
                .internal_bind_address
                .unwrap_or_else(|| DEFAULT_INTERNAL_BIND_ADDRESS.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_args() -> EngineConfigArgs {
        EngineConfigArgs {
            connection_string: None,
            config_file: None,
            queue_capacity: None,
            batch_size: None,
            pipe_name: None,
            failover_directory: None,
            dead_letter_directory: None,
            log: None,
            log_file: None,
        }
    }

    #[test]
    fn defaults_apply_with_no_args_or_toml() {
        let cfg = EngineConfig::resolve(empty_args());
        assert_eq!(cfg.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert_eq!(cfg.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(cfg.shutdown_timeout_secs, DEFAULT_SHUTDOWN_TIMEOUT_SECS);
    }

    #[test]
    fn cli_arg_overrides_default() {
        let mut args = empty_args();
        args.batch_size = Some(250);
        let cfg = EngineConfig::resolve(args);
        assert_eq!(cfg.batch_size, 250);
    }
}
