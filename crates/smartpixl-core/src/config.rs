//! Shared TOML-loading scaffolding for `EdgeConfig` and `EngineConfig`.
//!
//! Grounded in the teacher's `DaemonConfig::new` (`daemon/src/config/mod.rs`):
//! a three-tier priority — CLI/env flag, then a value from an optional TOML
//! file, then a built-in default — with a parse failure logged and treated
//! as "no TOML override" rather than a hard startup failure. The edge and
//! engine binaries each define their own `TomlConfig`-shaped struct and
//! resolved config type; this module only holds the load-and-merge
//! mechanics both share.

use std::path::Path;

use serde::de::DeserializeOwned;

/// Load and parse a TOML file at `path`. Returns `None` if the file is
/// absent (no override layer) or fails to parse (logged, falls back to
/// defaults rather than aborting startup — a malformed config file should
/// not take down the edge process).
pub fn load_toml_file<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let contents = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<T>(&contents) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::error!(path = %path.display(), err = %e, "failed to parse config file — using defaults");
            None
        }
    }
}

/// Resolve a single setting across the three priority tiers: an
/// already-`Option`-wrapped CLI/env value, an `Option` pulled out of the
/// parsed TOML, and a hard default.
pub fn resolve<T>(cli_or_env: Option<T>, toml_value: Option<T>, default: T) -> T {
    cli_or_env.or(toml_value).unwrap_or(default)
}

/// Resolve a setting from an environment variable by name, falling back to
/// a TOML value and then a default — for settings that only ever come from
/// the environment (secrets, URLs) rather than a `clap` flag.
pub fn resolve_env(var: &str, toml_value: Option<String>, default: &str) -> String {
    std::env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .or(toml_value)
        .unwrap_or_else(|| default.to_string())
}
