//! Runtime configuration for hosts embedding the core.
//!
//! # Responsibility
//! - Collect database and logging settings from the environment or a JSON
//!   document.
//! - Validate them before any storage is touched.
//!
//! # Invariants
//! - A validated config has a non-empty `db_path`, a positive busy timeout
//!   and, when set, an absolute `log_dir`.

use crate::db::{open_db_with_busy_timeout, DbResult};
use crate::logging::default_log_level;
use rusqlite::Connection;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const ENV_DB_PATH: &str = "NOTATKY_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "NOTATKY_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "NOTATKY_LOG_DIR";
pub const ENV_BUSY_TIMEOUT_MS: &str = "NOTATKY_BUSY_TIMEOUT_MS";

const DEFAULT_DB_FILE_NAME: &str = "notatky.sqlite3";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Configuration load/validation failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid value `{value}` for {key}")]
    InvalidValue { key: &'static str, value: String },
    #[error("{0}")]
    Invalid(String),
}

/// Settings for opening storage and starting logging.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    #[serde(default = "default_level_string")]
    pub log_level: String,
    /// Logging stays off when unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl CoreConfig {
    /// Config with defaults for everything but the database path.
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            log_level: default_level_string(),
            log_dir: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }

    /// Reads `NOTATKY_*` variables. Without `NOTATKY_DB_PATH` the database
    /// lives in the system temp directory.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Parses and validates a JSON config document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let db_path = read(ENV_DB_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE_NAME));
        let mut config = Self::new(db_path);

        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        config.log_dir = read(ENV_LOG_DIR).map(PathBuf::from);
        if let Some(raw) = read(ENV_BUSY_TIMEOUT_MS) {
            config.busy_timeout_ms = raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_BUSY_TIMEOUT_MS,
                value: raw,
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("db_path cannot be empty".to_string()));
        }
        if self.busy_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "busy_timeout_ms must be positive".to_string(),
            ));
        }
        if let Some(log_dir) = &self.log_dir {
            if !log_dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "log_dir must be an absolute path, got `{}`",
                    log_dir.display()
                )));
            }
        }
        Ok(())
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Opens the configured database with migrations applied.
    pub fn open_database(&self) -> DbResult<Connection> {
        open_db_with_busy_timeout(&self.db_path, self.busy_timeout())
    }
}

fn default_level_string() -> String {
    default_log_level().to_string()
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}
