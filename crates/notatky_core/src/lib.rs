//! Core domain logic for notatky.
//!
//! Notes own an ordered sequence of text and image children. This crate keeps
//! that ordering unique and dense, reconciles client-declared orderings
//! against storage, and is the single source of truth for those invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod wire;

pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use model::child::{
    ChildContent, ChildDescriptor, ChildId, ChildRecord, ChildSpec, ChildVariant, MAX_POSITION,
};
pub use model::note::{Note, NoteId, UserId};
pub use repo::content_store::{ContentStore, SqliteContentStore};
pub use repo::{RepoError, RepoResult};
pub use service::error::{Missing, ServiceError, ServiceResult};
pub use service::note_child_service::NoteChildService;
pub use service::note_locks::NoteLocks;
pub use service::note_service::NoteService;
pub use service::reconcile::SyncOutcome;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
