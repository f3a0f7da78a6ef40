//! # Configuration
//!
//! Environment-driven settings for the server binary.
//!
//! | Variable | Default |
//! |---|---|
//! | `DB_URI` | `sqlite:app.db` |
//! | `SUPERHEROES_ADDR` | `127.0.0.1:5555` |
//! | `SUPERHEROES_DB_MAX_CONNECTIONS` | `10` |
//! | `SUPERHEROES_MAX_BODY_SIZE` | `1048576` |
//! | `SUPERHEROES_SHUTDOWN_TIMEOUT_SECS` | `30` |
//! | `SUPERHEROES_SEED` | `true` |
//! | `SUPERHEROES_LOG_FORMAT` | `text` |

use crate::error::{Error, Result};
use crate::server::ServerConfig;
use std::str::FromStr;
use std::time::Duration;

/// Default database location
pub const DEFAULT_DATABASE_URL: &str = "sqlite:app.db";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Full application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,
    /// SQLx database URL
    pub database_url: String,
    /// Pool size for file-backed databases
    pub max_connections: u32,
    /// Insert demo data into an empty database on startup
    pub seed: bool,
    /// Log output format
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 10,
            seed: true,
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Read configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the first variable that fails to parse
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary lookup function
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the first variable that fails to parse
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let server = ServerConfig {
            address: parse_var(&lookup, "SUPERHEROES_ADDR")?.unwrap_or(defaults.server.address),
            max_body_size: parse_var(&lookup, "SUPERHEROES_MAX_BODY_SIZE")?
                .unwrap_or(defaults.server.max_body_size),
            shutdown_timeout: parse_var(&lookup, "SUPERHEROES_SHUTDOWN_TIMEOUT_SECS")?
                .map_or(defaults.server.shutdown_timeout, Duration::from_secs),
            ..defaults.server
        };

        Ok(Self {
            server,
            database_url: lookup("DB_URI")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.database_url),
            max_connections: parse_var(&lookup, "SUPERHEROES_DB_MAX_CONNECTIONS")?
                .unwrap_or(defaults.max_connections),
            seed: parse_bool(&lookup, "SUPERHEROES_SEED")?.unwrap_or(defaults.seed),
            log_format: parse_var(&lookup, "SUPERHEROES_LOG_FORMAT")?
                .unwrap_or(defaults.log_format),
        })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|e: T::Err| Error::Config {
            key: key.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn parse_bool(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<bool>> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        other => Err(Error::Config {
            key: key.to_string(),
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.database_url, "sqlite:app.db");
        assert_eq!(config.server.address.port(), 5555);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("DB_URI", "sqlite::memory:"),
            ("SUPERHEROES_ADDR", "0.0.0.0:8080"),
            ("SUPERHEROES_DB_MAX_CONNECTIONS", "4"),
            ("SUPERHEROES_SEED", "off"),
            ("SUPERHEROES_LOG_FORMAT", "JSON"),
            ("SUPERHEROES_SHUTDOWN_TIMEOUT_SECS", "5"),
        ])
        .unwrap();

        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.server.address.to_string(), "0.0.0.0:8080");
        assert_eq!(config.max_connections, 4);
        assert!(!config.seed);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.server.shutdown_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        let err = config_from(&[("SUPERHEROES_ADDR", "not-an-addr")]).unwrap_err();
        assert!(err.to_string().contains("SUPERHEROES_ADDR"));

        let err = config_from(&[("SUPERHEROES_SEED", "maybe")]).unwrap_err();
        assert!(err.to_string().contains("SUPERHEROES_SEED"));
    }

    #[test]
    fn test_blank_values_fall_back() {
        let config = config_from(&[("DB_URI", "  "), ("SUPERHEROES_DB_MAX_CONNECTIONS", "")]).unwrap();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.max_connections, 10);
    }
}
