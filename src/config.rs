//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::str::FromStr;

use crate::domain::Currency;

/// Where ledgers are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(ConfigError::InvalidValue("STORAGE_BACKEND")),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(ConfigError::InvalidValue("LOG_FORMAT")),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub storage_backend: StorageBackend,

    /// Database connection URL (required for the postgres backend)
    pub database_url: Option<String>,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Currency of newly created ledgers
    pub ledger_currency: Currency,

    /// Capacity of the purchase event queue
    pub event_queue_capacity: usize,

    /// Attempts per event before the consumer gives up on it
    pub event_max_attempts: u32,

    /// First retry delay; later delays double
    pub event_retry_backoff_ms: u64,

    pub default_page_limit: usize,
    pub max_page_limit: usize,

    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &'static str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let storage_backend: StorageBackend = var("STORAGE_BACKEND", "postgres").parse()?;

        let database_url = lookup("DATABASE_URL");
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingEnv("DATABASE_URL"));
        }

        let database_max_connections = var("DATABASE_MAX_CONNECTIONS", "10")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let host = var("HOST", "127.0.0.1");

        let port = var("PORT", "3000")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PORT"))?;

        let environment = var("ENVIRONMENT", "development");

        let ledger_currency = var("LEDGER_CURRENCY", "BRL")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("LEDGER_CURRENCY"))?;

        let event_queue_capacity = parse_positive(&var("EVENT_QUEUE_CAPACITY", "256"), "EVENT_QUEUE_CAPACITY")?;
        let event_max_attempts = var("EVENT_MAX_ATTEMPTS", "5")
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or(ConfigError::InvalidValue("EVENT_MAX_ATTEMPTS"))?;
        let event_retry_backoff_ms = var("EVENT_RETRY_BACKOFF_MS", "200")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("EVENT_RETRY_BACKOFF_MS"))?;
        let default_page_limit = parse_positive(&var("DEFAULT_PAGE_LIMIT", "20"), "DEFAULT_PAGE_LIMIT")?;
        let max_page_limit = parse_positive(&var("MAX_PAGE_LIMIT", "100"), "MAX_PAGE_LIMIT")?;
        if default_page_limit > max_page_limit {
            return Err(ConfigError::InvalidValue("DEFAULT_PAGE_LIMIT"));
        }

        let log_format = var("LOG_FORMAT", "pretty").parse()?;

        Ok(Self {
            storage_backend,
            database_url,
            database_max_connections,
            host,
            port,
            environment,
            ledger_currency,
            event_queue_capacity,
            event_max_attempts,
            event_retry_backoff_ms,
            default_page_limit,
            max_page_limit,
            log_format,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_positive(value: &str, key: &'static str) -> Result<usize, ConfigError> {
    match value.parse::<usize>() {
        Ok(0) | Err(_) => Err(ConfigError::InvalidValue(key)),
        Ok(n) => Ok(n),
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_with_memory_backend() {
        let config = load(&[("STORAGE_BACKEND", "memory")]).unwrap();
        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert!(config.database_url.is_none());
        assert_eq!(config.port, 3000);
        assert_eq!(config.ledger_currency, Currency::Brl);
        assert_eq!(config.event_queue_capacity, 256);
        assert_eq!(config.event_max_attempts, 5);
        assert_eq!(config.event_retry_backoff_ms, 200);
        assert_eq!(config.default_page_limit, 20);
        assert_eq!(config.max_page_limit, 100);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(!config.is_production());
    }

    #[test]
    fn test_postgres_requires_database_url() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingEnv("DATABASE_URL"))));
        let config = load(&[("DATABASE_URL", "postgres://localhost/ledger")]).unwrap();
        assert_eq!(config.storage_backend, StorageBackend::Postgres);
    }

    #[test]
    fn test_invalid_values_are_named() {
        assert!(matches!(
            load(&[("STORAGE_BACKEND", "memory"), ("PORT", "http")]),
            Err(ConfigError::InvalidValue("PORT"))
        ));
        assert!(matches!(
            load(&[("STORAGE_BACKEND", "memory"), ("LEDGER_CURRENCY", "XYZ")]),
            Err(ConfigError::InvalidValue("LEDGER_CURRENCY"))
        ));
        assert!(matches!(
            load(&[("STORAGE_BACKEND", "memory"), ("EVENT_QUEUE_CAPACITY", "0")]),
            Err(ConfigError::InvalidValue("EVENT_QUEUE_CAPACITY"))
        ));
        assert!(matches!(
            load(&[("STORAGE_BACKEND", "memory"), ("EVENT_MAX_ATTEMPTS", "0")]),
            Err(ConfigError::InvalidValue("EVENT_MAX_ATTEMPTS"))
        ));
        assert!(matches!(
            load(&[("STORAGE_BACKEND", "memory"), ("LOG_FORMAT", "xml")]),
            Err(ConfigError::InvalidValue("LOG_FORMAT"))
        ));
        assert!(matches!(
            load(&[("STORAGE_BACKEND", "sqlite")]),
            Err(ConfigError::InvalidValue("STORAGE_BACKEND"))
        ));
    }
}
