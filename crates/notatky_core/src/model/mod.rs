//! Domain model for notes and their positioned children.
//!
//! # Responsibility
//! - Define the canonical data structures used by core business logic.
//! - Model child content as a sum type rather than a tag plus nullable fields.
//!
//! # Invariants
//! - Every record is identified by a stable UUID that is never reused.
//! - A child's variant always matches the content it references.

pub mod child;
pub mod note;
