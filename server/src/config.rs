//! Runtime configuration, read from environment variables at startup.

use std::env;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid BIND_ADDR {value:?}: {source}")]
    BindAddr {
        value: String,
        #[source]
        source: AddrParseError,
    },

    #[error("Invalid STORE_TIMEOUT_MS {0:?}: expected a positive number of milliseconds")]
    StoreTimeout(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP listener binds to (`BIND_ADDR`).
    pub bind_addr: SocketAddr,
    /// PostgreSQL connection string (`DATABASE_URL`). When unset, recipes
    /// live in memory.
    pub database_url: Option<String>,
    /// JSON file used to seed the in-memory store (`RECIPES_SEED_FILE`).
    pub seed_file: Option<PathBuf>,
    /// Deadline for a single store call (`STORE_TIMEOUT_MS`).
    pub store_timeout: Duration,
    /// Emit `X-Store-Call-Count` on responses (`TRACK_STORE_CALL_COUNT=1`).
    pub track_store_calls: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Empty values count as unset
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_value = var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_value
            .parse::<SocketAddr>()
            .map_err(|source| ConfigError::BindAddr {
                value: bind_value.clone(),
                source,
            })?;

        let store_timeout = match var("STORE_TIMEOUT_MS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => return Err(ConfigError::StoreTimeout(raw)),
            },
            None => Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
        };

        Ok(Self {
            bind_addr,
            database_url: var("DATABASE_URL"),
            seed_file: var("RECIPES_SEED_FILE").map(PathBuf::from),
            store_timeout,
            track_store_calls: var("TRACK_STORE_CALL_COUNT").is_some_and(|v| v == "1"),
        })
    }
}
