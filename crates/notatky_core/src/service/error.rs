//! Error taxonomy at the service boundary.
//!
//! # Invariants
//! - Client-caused errors (`NotFound`, `PositionConflict`, `InvalidEntry`)
//!   are returned as-is and are never worth retrying.
//! - `StorageFailure` is retryable; the failed operation left no partial
//!   state because every mutation runs in one transaction.
//! - `Internal` means stored state broke an invariant and must surface.

use crate::model::child::ChildId;
use crate::model::note::NoteId;
use crate::repo::RepoError;
use std::fmt::{Display, Formatter};
use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// What a `NotFound` error failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    /// Note is absent or not owned by the caller.
    Note(NoteId),
    /// Child is absent or belongs to another note.
    Child(ChildId),
}

impl Display for Missing {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Note(id) => write!(f, "note {id}"),
            Self::Child(id) => write!(f, "child {id}"),
        }
    }
}

/// Errors from note and note-child use cases.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(Missing),
    #[error("position {position} is already taken in note {note_id}")]
    PositionConflict { note_id: NoteId, position: u32 },
    #[error("invalid entry: {0}")]
    InvalidEntry(String),
    #[error("storage failure: {0}")]
    StorageFailure(#[source] RepoError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Whether a caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageFailure(_))
    }

    /// Stable snake_case code for logs and wire responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::PositionConflict { .. } => "position_conflict",
            Self::InvalidEntry(_) => "invalid_entry",
            Self::StorageFailure(_) => "storage_failure",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::InvalidData(message) => Self::Internal(message),
            other => Self::StorageFailure(other),
        }
    }
}

impl From<rusqlite::Error> for ServiceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::StorageFailure(RepoError::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::{Missing, ServiceError};
    use crate::repo::RepoError;
    use uuid::Uuid;

    #[test]
    fn only_storage_failures_are_retryable() {
        let storage = ServiceError::from(RepoError::Backend("disk full".to_string()));
        assert!(storage.is_retryable());
        assert_eq!(storage.code(), "storage_failure");

        let not_found = ServiceError::NotFound(Missing::Note(Uuid::new_v4()));
        assert!(!not_found.is_retryable());
    }

    #[test]
    fn invalid_persisted_data_maps_to_internal() {
        let err = ServiceError::from(RepoError::InvalidData("bad row".to_string()));
        assert!(matches!(err, ServiceError::Internal(message) if message == "bad row"));
    }
}
