//! Ledger configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! | Variable                        | Default        |
//! |---------------------------------|----------------|
//! | `COINSHOP_DATABASE_PATH`        | `./coinshop.db`|
//! | `COINSHOP_MAX_CONNECTIONS`      | `8`            |
//! | `COINSHOP_BUSY_TIMEOUT_MS`      | `5000`         |
//! | `COINSHOP_OPERATION_TIMEOUT_MS` | `3000`         |
//! | `COINSHOP_STARTING_BALANCE`     | `1000`         |

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::pool::DbConfig;
use coinshop_core::{Coins, STARTING_BALANCE};

/// Ledger engine configuration.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size (one unit of work holds one connection)
    pub max_connections: u32,

    /// How long a writer waits for another writer's lock
    pub busy_timeout: Duration,

    /// Deadline applied when the caller does not supply one
    pub operation_timeout: Duration,

    /// Balance granted by `open_account`
    pub starting_balance: i64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            database_path: PathBuf::from("./coinshop.db"),
            max_connections: 8,
            busy_timeout: Duration::from_millis(5000),
            operation_timeout: Duration::from_millis(3000),
            starting_balance: STARTING_BALANCE,
        }
    }
}

impl LedgerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = LedgerConfig::default();

        let config = LedgerConfig {
            database_path: lookup("COINSHOP_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),

            max_connections: parse_or(&lookup, "COINSHOP_MAX_CONNECTIONS", defaults.max_connections)?,

            busy_timeout: Duration::from_millis(parse_or(
                &lookup,
                "COINSHOP_BUSY_TIMEOUT_MS",
                defaults.busy_timeout.as_millis() as u64,
            )?),

            operation_timeout: Duration::from_millis(parse_or(
                &lookup,
                "COINSHOP_OPERATION_TIMEOUT_MS",
                defaults.operation_timeout.as_millis() as u64,
            )?),

            starting_balance: parse_or(&lookup, "COINSHOP_STARTING_BALANCE", defaults.starting_balance)?,
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue("COINSHOP_MAX_CONNECTIONS".to_string()));
        }
        if config.operation_timeout.is_zero() {
            return Err(ConfigError::InvalidValue("COINSHOP_OPERATION_TIMEOUT_MS".to_string()));
        }
        if config.starting_balance < 0 {
            return Err(ConfigError::InvalidValue("COINSHOP_STARTING_BALANCE".to_string()));
        }

        Ok(config)
    }

    /// Store settings derived from this configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path.clone())
            .max_connections(self.max_connections)
            .busy_timeout(self.busy_timeout)
    }

    pub fn starting_balance(&self) -> Coins {
        Coins::new(self.starting_balance)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
