//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Own transaction boundaries and per-note serialization.
//! - Map persistence failures into the service error taxonomy.

pub mod error;
pub mod note_child_service;
pub mod note_locks;
pub mod note_service;
pub mod position_shifter;
pub mod reconcile;
