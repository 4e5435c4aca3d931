use anyhow::Result;
use chrono_tz::Tz;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use crate::constants::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    /// Process-local store for development; data is lost on restart.
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(anyhow::anyhow!("Unknown STORAGE_BACKEND '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub storage_backend: StorageBackend,
    pub default_page_size: i64,
    pub max_page_size: i64,
    pub filter_timezone: Tz,
    pub self_leave_succeeds: bool,
    pub sweep_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_SERVER_PORT,
            storage_backend: StorageBackend::Postgres,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            filter_timezone: chrono_tz::Asia::Tokyo,
            self_leave_succeeds: false,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let filter_timezone = env::var("FILTER_TIMEZONE")
            .unwrap_or_else(|_| DEFAULT_FILTER_TIMEZONE.to_string());
        let filter_timezone: Tz = filter_timezone
            .parse()
            .map_err(|_| anyhow::anyhow!("FILTER_TIMEZONE '{}' is not a known timezone", filter_timezone))?;

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => StorageBackend::Postgres,
        };

        let max_page_size = env_or("MAX_PAGE_SIZE", MAX_PAGE_SIZE).max(1);

        Ok(Self {
            port: env_or("PORT", DEFAULT_SERVER_PORT),
            storage_backend,
            default_page_size: env_or("DEFAULT_PAGE_SIZE", DEFAULT_PAGE_SIZE).clamp(1, max_page_size),
            max_page_size,
            filter_timezone,
            self_leave_succeeds: env_or("SELF_LEAVE_SUCCEEDS", false),
            sweep_interval_secs: env_or("SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS).max(1),
        })
    }

    /// Period between sweeps. Never zero, since `tokio::time::interval` panics on it.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

/// Reads and parses an env var, falling back to `default` when unset or malformed.
pub(crate) fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}
