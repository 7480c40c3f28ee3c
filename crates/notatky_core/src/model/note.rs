//! Note domain model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a note.
pub type NoteId = Uuid;

/// Identifier of the user a note belongs to.
///
/// Issued by the external account system; the core treats it as opaque.
pub type UserId = String;

/// Top-level container owning an ordered sequence of children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    /// Epoch ms of the last mutation on the note or any of its children.
    pub last_interacted_at: i64,
}
