//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use alert_engine::config::{DEFAULT_COOLDOWN, DEFAULT_COUNTDOWN_EXPIRY, DEFAULT_SEND_TIMEOUT};
use alert_engine::EngineConfig;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// SQLite database URL.
    pub database_url: String,
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Exported danger model, if any.
    pub danger_model_path: Option<PathBuf>,
    pub cooldown: Duration,
    pub countdown_expiry: Duration,
    pub send_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `API_ADDR` | Server bind address | `127.0.0.1:8790` |
    /// | `SQLITE_PATH` | SQLite database URL | `sqlite:asfalis.db?mode=rwc` |
    /// | `LOG_LEVEL` | Log filter when `RUST_LOG` is unset | `info` |
    /// | `DANGER_MODEL_PATH` | JSON export of the danger model | (none, detection disabled) |
    /// | `SOS_COOLDOWN_SECONDS` | Minimum seconds between triggers | `20` |
    /// | `COUNTDOWN_EXPIRY_SECONDS` | Age at which a countdown alert is stale | `60` |
    /// | `NOTIFY_SEND_TIMEOUT_SECONDS` | Timeout for one notification send | `10` |
    ///
    /// Twilio and FCM credentials are read by `notifier::NotifierConfig::from_env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let addr = env::var("API_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8790".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        let database_url = env::var("SQLITE_PATH")
            .unwrap_or_else(|_| "sqlite:asfalis.db?mode=rwc".to_string());

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let danger_model_path = env::var("DANGER_MODEL_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            addr,
            database_url,
            log_level,
            danger_model_path,
            cooldown: seconds_var("SOS_COOLDOWN_SECONDS", DEFAULT_COOLDOWN)?,
            countdown_expiry: seconds_var("COUNTDOWN_EXPIRY_SECONDS", DEFAULT_COUNTDOWN_EXPIRY)?,
            send_timeout: seconds_var("NOTIFY_SEND_TIMEOUT_SECONDS", DEFAULT_SEND_TIMEOUT)?,
        })
    }

    /// Engine tunables derived from this configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            cooldown: self.cooldown,
            countdown_expiry: self.countdown_expiry,
            send_timeout: self.send_timeout,
            ..EngineConfig::default()
        }
    }
}

fn seconds_var(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    match env::var(name) {
        Ok(raw) => parse_seconds(&raw).ok_or(ConfigError::InvalidSeconds { name, value: raw }),
        Err(_) => Ok(default),
    }
}

fn parse_seconds(raw: &str) -> Option<Duration> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid API_ADDR format")]
    InvalidAddr,

    #[error("{name} must be a positive number of seconds, got '{value}'")]
    InvalidSeconds { name: &'static str, value: String },
}
