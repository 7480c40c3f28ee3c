//! Note use-case service.
//!
//! # Responsibility
//! - Provide note create/get/list/rename/delete APIs for one user.
//! - Cascade note deletion to every child and its content explicitly.
//!
//! # Invariants
//! - Note list is always sorted by `last_interacted_at DESC, id ASC`.
//! - A note is only visible to the user that owns it.
//! - Deletion runs under the note lock in one transaction: either the whole
//!   note with its children disappears or nothing changes.

use crate::model::note::{Note, NoteId};
use crate::repo::child_index::SqliteChildIndex;
use crate::repo::content_store::{ContentStore, SqliteContentStore};
use crate::repo::ensure_schema_ready;
use crate::repo::note_repo::SqliteNoteRepository;
use crate::service::error::{Missing, ServiceError, ServiceResult};
use crate::service::note_locks::NoteLocks;
use log::info;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use uuid::Uuid;

/// Note lifecycle facade. Shares its [`NoteLocks`] with the child service so
/// a note deletion never interleaves with a child mutation.
pub struct NoteService<'conn, S: ContentStore = SqliteContentStore> {
    conn: &'conn Connection,
    store: S,
    locks: NoteLocks,
}

impl<'conn> NoteService<'conn, SqliteContentStore> {
    pub fn try_new(conn: &'conn Connection, locks: NoteLocks) -> ServiceResult<Self> {
        Self::with_store(conn, SqliteContentStore, locks)
    }
}

impl<'conn, S: ContentStore> NoteService<'conn, S> {
    pub fn with_store(conn: &'conn Connection, store: S, locks: NoteLocks) -> ServiceResult<Self> {
        ensure_schema_ready(
            conn,
            &[
                "notes",
                "user_notes",
                "note_children",
                "text_contents",
                "image_contents",
            ],
        )?;
        Ok(Self { conn, store, locks })
    }

    /// Creates a note owned by `user_id`.
    pub fn create_note(&self, user_id: &str, title: &str) -> ServiceResult<Note> {
        let title = normalize_title(title)?;
        if user_id.trim().is_empty() {
            return Err(ServiceError::InvalidEntry(
                "user id cannot be blank".to_string(),
            ));
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let note = SqliteNoteRepository::attach(&tx).create_note(Uuid::new_v4(), user_id, title)?;
        tx.commit()?;

        info!(
            "event=note_create module=service status=ok note_id={}",
            note.id
        );
        Ok(note)
    }

    /// Loads a note owned by `user_id`.
    pub fn get_note(&self, user_id: &str, note_id: NoteId) -> ServiceResult<Note> {
        let notes = SqliteNoteRepository::attach(self.conn);
        if !notes.owns_note(user_id, note_id)? {
            return Err(ServiceError::NotFound(Missing::Note(note_id)));
        }
        notes
            .get_note(note_id)?
            .ok_or(ServiceError::NotFound(Missing::Note(note_id)))
    }

    /// Lists notes owned by `user_id`, most recently touched first.
    pub fn list_notes_for_user(&self, user_id: &str) -> ServiceResult<Vec<Note>> {
        Ok(SqliteNoteRepository::attach(self.conn).list_notes_for_user(user_id)?)
    }

    /// Replaces the title of a note owned by `user_id`.
    pub fn rename_note(&self, user_id: &str, note_id: NoteId, title: &str) -> ServiceResult<Note> {
        let title = normalize_title(title)?;
        self.locks.with_note(note_id, || {
            let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
            let notes = SqliteNoteRepository::attach(&tx);
            if !notes.owns_note(user_id, note_id)? || !notes.rename_note(note_id, title)? {
                return Err(ServiceError::NotFound(Missing::Note(note_id)));
            }
            let note = notes
                .get_note(note_id)?
                .ok_or_else(|| ServiceError::Internal(format!("note {note_id} missing after rename")))?;
            tx.commit()?;
            Ok(note)
        })
    }

    /// Deletes a note owned by `user_id` with all of its children.
    ///
    /// Returns the number of children removed.
    pub fn delete_note(&self, user_id: &str, note_id: NoteId) -> ServiceResult<usize> {
        let removed = self.locks.with_note(note_id, || {
            let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
            let notes = SqliteNoteRepository::attach(&tx);
            if !notes.owns_note(user_id, note_id)? {
                return Err(ServiceError::NotFound(Missing::Note(note_id)));
            }

            let index = SqliteChildIndex::attach(&tx);
            let children = index.list_by_note(note_id)?;
            for record in &children {
                self.store.delete(&tx, record.variant, record.content_id)?;
            }
            index.delete_by_note(note_id)?;
            notes.delete_note(note_id)?;
            tx.commit()?;
            Ok(children.len())
        })?;

        info!(
            "event=note_delete module=service status=ok note_id={} children_removed={}",
            note_id, removed
        );
        Ok(removed)
    }
}

fn normalize_title(title: &str) -> ServiceResult<&str> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::InvalidEntry(
            "note title cannot be blank".to_string(),
        ));
    }
    Ok(trimmed)
}
