//! Application configuration loaded from environment variables.

use event_store::LogConfig;
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is not set or is empty.
    #[error("Property {0} was not found in the environment")]
    MissingProperty(&'static str),

    /// A variable is set but its value cannot be used.
    #[error("Property {name} is invalid: {reason}")]
    InvalidProperty { name: &'static str, reason: String },
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL connection string; the in-memory log is
///   used when unset
/// - `EVENT_TABLE`: name of the event table (required)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub log: LogConfig,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through `lookup`, which returns a variable's value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("PORT") {
            Some(port) => port.parse().map_err(|e| ConfigError::InvalidProperty {
                name: "PORT",
                reason: format!("{e}"),
            })?,
            None => 3000,
        };

        let table = lookup("EVENT_TABLE")
            .filter(|table| !table.is_empty())
            .ok_or(ConfigError::MissingProperty("EVENT_TABLE"))?;
        let log = LogConfig::for_table(table).map_err(|e| ConfigError::InvalidProperty {
            name: "EVENT_TABLE",
            reason: e.to_string(),
        })?;

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            log_level: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            log,
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
