//! Service configuration, read from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use crate::risk::{DEFAULT_THRESHOLD, DEFAULT_VERIFY_URL};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_RECAPTCHA_TIMEOUT_SECS: u64 = 5;
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173,http://localhost:3000";
const DEFAULT_REGISTRATIONS_PER_HOUR: u32 = 5;
const DEFAULT_API_PER_MINUTE: u32 = 60;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub storage_backend: StorageBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub bind_addr: SocketAddr,
    /// `None` leaves the risk gate unconfigured
    pub recaptcha_secret_key: Option<String>,
    pub recaptcha_threshold: f64,
    pub recaptcha_verify_url: String,
    pub recaptcha_timeout: Duration,
    pub cors_origins: Vec<String>,
    pub rate_limit_enabled: bool,
    pub rate_limit_registrations_per_hour: u32,
    pub rate_limit_api_per_minute: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        info!(
            storage = ?config.storage_backend,
            bind_addr = %config.bind_addr,
            risk_gate_configured = config.recaptcha_secret_key.is_some(),
            rate_limit_enabled = config.rate_limit_enabled,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let storage_backend = match get("STORAGE_BACKEND")
            .map(|v| v.to_lowercase())
            .as_deref()
        {
            None | Some("postgres") => StorageBackend::Postgres,
            Some("memory") => StorageBackend::Memory,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "STORAGE_BACKEND".to_string(),
                    value: other.to_string(),
                })
            }
        };

        let database_url = get("DATABASE_URL");
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingEnv("DATABASE_URL".to_string()));
        }

        let db_max_connections =
            parse_or(&get, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?;
        if db_max_connections == 0 {
            return Err(ConfigError::InvalidConfig(
                "DB_MAX_CONNECTIONS must be at least 1".to_string(),
            ));
        }

        let bind_addr = parse_or(
            &get,
            "BIND_ADDR",
            DEFAULT_BIND_ADDR.parse::<SocketAddr>().map_err(|e| {
                ConfigError::InvalidConfig(format!("bad default bind address: {}", e))
            })?,
        )?;

        let recaptcha_threshold = parse_or(&get, "RECAPTCHA_THRESHOLD", DEFAULT_THRESHOLD)?;
        if !(0.0..=1.0).contains(&recaptcha_threshold) {
            return Err(ConfigError::InvalidConfig(
                "RECAPTCHA_THRESHOLD must be between 0 and 1".to_string(),
            ));
        }

        let timeout_secs = parse_or(&get, "RECAPTCHA_TIMEOUT_SECS", DEFAULT_RECAPTCHA_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "RECAPTCHA_TIMEOUT_SECS must be at least 1".to_string(),
            ));
        }

        let cors_origins = get("CORS_ORIGINS")
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        let rate_limit_enabled = match get("RATE_LIMIT_ENABLED").map(|v| v.to_lowercase()).as_deref() {
            None | Some("true") | Some("1") | Some("yes") => true,
            Some("false") | Some("0") | Some("no") => false,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "RATE_LIMIT_ENABLED".to_string(),
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            storage_backend,
            database_url,
            db_max_connections,
            bind_addr,
            recaptcha_secret_key: get("RECAPTCHA_SECRET_KEY"),
            recaptcha_threshold,
            recaptcha_verify_url: get("RECAPTCHA_VERIFY_URL")
                .unwrap_or_else(|| DEFAULT_VERIFY_URL.to_string()),
            recaptcha_timeout: Duration::from_secs(timeout_secs),
            cors_origins,
            rate_limit_enabled,
            rate_limit_registrations_per_hour: parse_or(
                &get,
                "RATE_LIMIT_REGISTRATIONS_PER_HOUR",
                DEFAULT_REGISTRATIONS_PER_HOUR,
            )?,
            rate_limit_api_per_minute: parse_or(
                &get,
                "RATE_LIMIT_API_PER_MINUTE",
                DEFAULT_API_PER_MINUTE,
            )?,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
        }),
    }
}
