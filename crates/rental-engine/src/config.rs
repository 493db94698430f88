//! Engine configuration.
//!
//! Loaded from environment variables with fallback to defaults. Pricing
//! policy is not configurable here: it is fixed in `rental-core::pricing` so a
//! client preview and the commit always agree.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use rental_core::DEFAULT_MAX_QUANTITY;
use rental_db::DbConfig;

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// SQLite database file.
    pub database_path: PathBuf,

    /// Pool size.
    pub max_connections: u32,

    /// Minutes after the scheduled return before lateness is billed.
    /// Default: 0 (lateness counts from the scheduled end date)
    pub late_grace_minutes: i64,

    /// Upper bound on `quantity` for one booking.
    pub max_quantity: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            database_path: PathBuf::from("rental.db"),
            max_connections: 5,
            late_grace_minutes: 0,
            max_quantity: DEFAULT_MAX_QUANTITY,
        }
    }
}

impl EngineConfig {
    /// Loads configuration from environment variables.
    ///
    /// ## Environment Variables
    /// - `RENTAL_DATABASE_PATH`: database file (default `rental.db`)
    /// - `RENTAL_MAX_CONNECTIONS`: pool size (default 5)
    /// - `RENTAL_LATE_GRACE_MINUTES`: lateness grace (default 0)
    /// - `RENTAL_MAX_QUANTITY`: quantity cap (default 10)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = EngineConfig::default();

        let config = EngineConfig {
            database_path: env::var("RENTAL_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),

            max_connections: parse_var("RENTAL_MAX_CONNECTIONS", defaults.max_connections)?,

            late_grace_minutes: parse_var("RENTAL_LATE_GRACE_MINUTES", defaults.late_grace_minutes)?,

            max_quantity: parse_var("RENTAL_MAX_QUANTITY", defaults.max_quantity)?,
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue("RENTAL_MAX_CONNECTIONS".to_string()));
        }
        if config.late_grace_minutes < 0 {
            return Err(ConfigError::InvalidValue("RENTAL_LATE_GRACE_MINUTES".to_string()));
        }
        if config.max_quantity < 1 {
            return Err(ConfigError::InvalidValue("RENTAL_MAX_QUANTITY".to_string()));
        }

        Ok(config)
    }

    /// Database settings derived from this configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path).max_connections(self.max_connections)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        Err(_) => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
