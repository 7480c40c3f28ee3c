//! Note child domain model.
//!
//! # Responsibility
//! - Define child records, their content payloads and the descriptors
//!   handed to collaborators.
//!
//! # Invariants
//! - `ChildContent` carries exactly one payload shape per variant.
//! - `position` is zero-based and non-negative.

use crate::model::note::NoteId;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a child record.
pub type ChildId = Uuid;

/// Identifier of a content row in the content store.
pub type ContentId = Uuid;

/// Highest position a child may occupy. Keeps `position + 1` and the
/// negative parking range inside SQLite's signed integers.
pub const MAX_POSITION: u32 = i32::MAX as u32;

/// Runtime discriminator of a child's content shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildVariant {
    Text,
    Image,
}

impl ChildVariant {
    /// Storage/wire tag for this variant.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
        }
    }

    /// Parses a storage/wire tag. Returns `None` for unknown tags.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            _ => None,
        }
    }
}

impl Display for ChildVariant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of one child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildContent {
    /// Text block body.
    Text(String),
    /// Reference to an image blob held by the external blob storage.
    Image(String),
}

impl ChildContent {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn image(blob_ref: impl Into<String>) -> Self {
        Self::Image(blob_ref.into())
    }

    pub fn variant(&self) -> ChildVariant {
        match self {
            Self::Text(_) => ChildVariant::Text,
            Self::Image(_) => ChildVariant::Image,
        }
    }

    /// Checks payload rules that storage cannot express.
    ///
    /// Text may be empty (a fresh block); an image must reference a blob.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Text(_) => Ok(()),
            Self::Image(blob_ref) if blob_ref.trim().is_empty() => {
                Err("image content requires a non-blank blob reference".to_string())
            }
            Self::Image(_) => Ok(()),
        }
    }
}

/// One positioned entry in a note's sequence, as stored in the child index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildRecord {
    pub id: ChildId,
    /// Lookup key of the owning note, not an ownership edge.
    pub note_id: NoteId,
    pub variant: ChildVariant,
    pub content_id: ContentId,
    pub position: u32,
}

/// Child as exposed to collaborators: record identity plus resolved content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildDescriptor {
    pub id: ChildId,
    pub content: ChildContent,
    pub position: u32,
}

impl ChildDescriptor {
    pub fn variant(&self) -> ChildVariant {
        self.content.variant()
    }
}

/// Desired state of one child in a sync batch.
///
/// `id == None` (or an id the note does not know) requests a create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildSpec {
    pub id: Option<ChildId>,
    pub content: ChildContent,
    pub position: u32,
}

impl ChildSpec {
    /// Spec for a new child.
    pub fn new(content: ChildContent, position: u32) -> Self {
        Self {
            id: None,
            content,
            position,
        }
    }

    /// Spec that targets an existing child.
    pub fn existing(id: ChildId, content: ChildContent, position: u32) -> Self {
        Self {
            id: Some(id),
            content,
            position,
        }
    }
}

impl From<ChildDescriptor> for ChildSpec {
    fn from(value: ChildDescriptor) -> Self {
        Self::existing(value.id, value.content, value.position)
    }
}
