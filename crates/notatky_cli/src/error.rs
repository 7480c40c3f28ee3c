use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] notatky_core::ConfigError),
    #[error(transparent)]
    Logging(#[from] notatky_core::logging::LoggingError),
    #[error(transparent)]
    Db(#[from] notatky_core::DbError),
    #[error(transparent)]
    Service(#[from] notatky_core::ServiceError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code: 2 for caller mistakes, 1 for everything else.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Service(err) if !err.is_retryable() && err.code() != "internal" => 2,
            Self::Config(_) => 2,
            _ => 1,
        }
    }
}
