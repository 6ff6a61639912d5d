//! Explicit runtime configuration injected into providers and services.
//!
//! # Responsibility
//! - Describe where the database lives and how connections are tuned.
//! - Describe logging level/directory for binaries embedding the core.
//!
//! # Invariants
//! - No connection settings live in process-wide state; callers build an
//!   `AppConfig` and pass the relevant part down.

use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "FULFILLMENT_DB_PATH";
pub const ENV_BUSY_TIMEOUT_MS: &str = "FULFILLMENT_BUSY_TIMEOUT_MS";
pub const ENV_LOG_LEVEL: &str = "FULFILLMENT_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "FULFILLMENT_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "fulfillment.sqlite3";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Storage connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file path.
    pub db_path: PathBuf,
    /// How long a connection waits on a locked database before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl StoreConfig {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// Top-level configuration for an embedding binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub store: StoreConfig,
    #[serde(default = "default_level_string")]
    pub log_level: String,
    /// Absolute directory for rolling log files. `None` disables file logging.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Builds configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    ///
    /// Missing keys fall back to defaults: `fulfillment.sqlite3` in the
    /// working directory, 5s busy timeout, build-mode log level, no log dir.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = lookup(ENV_DB_PATH)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_DB_FILE_NAME), PathBuf::from);

        let busy_timeout_ms = match lookup(ENV_BUSY_TIMEOUT_MS) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: ENV_BUSY_TIMEOUT_MS,
                    value: raw,
                })?,
            None => DEFAULT_BUSY_TIMEOUT_MS,
        };

        let log_level = lookup(ENV_LOG_LEVEL)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(default_level_string);

        let log_dir = lookup(ENV_LOG_DIR)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            store: StoreConfig {
                db_path,
                busy_timeout_ms,
            },
            log_level,
            log_dir,
        })
    }
}

/// Configuration loading failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value } => {
                write!(f, "invalid value `{value}` for {key}")
            }
        }
    }
}

impl Error for ConfigError {}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

fn default_level_string() -> String {
    default_log_level().to_string()
}
