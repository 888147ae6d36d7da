//! Server configuration loaded from environment variables.
//!
//! - `TIMETABLE_HTTP_ADDR`: listen address (default `0.0.0.0:3000`)
//! - `TIMETABLE_DB_PATH`: SQLite file (default `timetable.sqlite3`);
//!   `:memory:` selects the process-local store
//! - `TIMETABLE_BUSY_TIMEOUT_MS`: how long a writer waits for the SQLite
//!   lock before failing with a busy error (default `5000`)
//! - `TIMETABLE_LOG`: tracing filter directive, falling back to `RUST_LOG`

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const HTTP_ADDR_VAR: &str = "TIMETABLE_HTTP_ADDR";
pub const DB_PATH_VAR: &str = "TIMETABLE_DB_PATH";
pub const BUSY_TIMEOUT_VAR: &str = "TIMETABLE_BUSY_TIMEOUT_MS";
pub const LOG_VAR: &str = "TIMETABLE_LOG";

const DEFAULT_HTTP_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 3000);
const DEFAULT_DB_PATH: &str = "timetable.sqlite3";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const MEMORY_LOCATION: &str = ":memory:";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Memory,
    Sqlite(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub http_addr: SocketAddr,
    pub store: StoreLocation,
    pub busy_timeout: Duration,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source; unset and blank
    /// variables take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let http_addr = match read(HTTP_ADDR_VAR) {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                var: HTTP_ADDR_VAR,
                value: raw.clone(),
                expected: "a socket address like 127.0.0.1:3000",
            })?,
            None => DEFAULT_HTTP_ADDR,
        };

        let store = match read(DB_PATH_VAR) {
            Some(raw) if raw.trim() == MEMORY_LOCATION => StoreLocation::Memory,
            Some(raw) => StoreLocation::Sqlite(PathBuf::from(raw.trim())),
            None => StoreLocation::Sqlite(PathBuf::from(DEFAULT_DB_PATH)),
        };

        let busy_timeout = match read(BUSY_TIMEOUT_VAR) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::Invalid {
                    var: BUSY_TIMEOUT_VAR,
                    value: raw.clone(),
                    expected: "a whole number of milliseconds",
                })?,
            None => Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
        };

        Ok(Self {
            http_addr,
            store,
            busy_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.http_addr, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(cfg.store, StoreLocation::Sqlite(PathBuf::from("timetable.sqlite3")));
        assert_eq!(cfg.busy_timeout, Duration::from_secs(5));
    }

    #[test]
    fn memory_location_selects_memory_store() {
        let cfg = config(&[(DB_PATH_VAR, ":memory:"), (BUSY_TIMEOUT_VAR, "250")]).unwrap();
        assert_eq!(cfg.store, StoreLocation::Memory);
        assert_eq!(cfg.busy_timeout, Duration::from_millis(250));
    }

    #[test]
    fn invalid_values_are_reported_with_variable_name() {
        let err = config(&[(HTTP_ADDR_VAR, "not-an-addr")]).unwrap_err();
        assert!(err.to_string().contains(HTTP_ADDR_VAR));
        let err = config(&[(BUSY_TIMEOUT_VAR, "-3")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: BUSY_TIMEOUT_VAR, .. }));
    }
}
