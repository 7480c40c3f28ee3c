//! Note child use-case service.
//!
//! # Responsibility
//! - Expose list/get/create/edit/move/delete/sync over one note's children.
//! - Wrap every call in a note-scoped lock and a single SQLite transaction.
//!
//! # Invariants
//! - Positions of a note stay unique after every call.
//! - Incremental create/delete/move keep positions dense (`0..n`).
//! - A content row and its child record are written or removed together;
//!   a failed call leaves the note exactly as it was.
//! - Every successful mutation touches the note's `last_interacted_at`.

use crate::model::child::{ChildContent, ChildDescriptor, ChildId, ChildRecord, ChildSpec};
use crate::model::note::{NoteId, UserId};
use crate::repo::child_index::SqliteChildIndex;
use crate::repo::content_store::{ContentStore, SqliteContentStore};
use crate::repo::ensure_schema_ready;
use crate::repo::note_repo::SqliteNoteRepository;
use crate::service::error::{Missing, ServiceError, ServiceResult};
use crate::service::note_locks::NoteLocks;
use crate::service::position_shifter::{insert_at, remove_at};
use crate::service::reconcile::{missing_content, ReconciliationEngine, SyncOutcome};
use log::{error, info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::time::Instant;
use uuid::Uuid;

const REQUIRED_TABLES: &[&str] = &[
    "notes",
    "user_notes",
    "note_children",
    "text_contents",
    "image_contents",
];

/// Facade over the child index, content store and reconciliation engine.
pub struct NoteChildService<'conn, S: ContentStore = SqliteContentStore> {
    conn: &'conn Connection,
    store: S,
    locks: NoteLocks,
    owner: Option<UserId>,
}

impl<'conn> NoteChildService<'conn, SqliteContentStore> {
    /// Creates a service over the SQLite content store.
    pub fn try_new(conn: &'conn Connection, locks: NoteLocks) -> ServiceResult<Self> {
        Self::with_store(conn, SqliteContentStore, locks)
    }
}

impl<'conn, S: ContentStore> NoteChildService<'conn, S> {
    /// Creates a service over a custom content store.
    pub fn with_store(conn: &'conn Connection, store: S, locks: NoteLocks) -> ServiceResult<Self> {
        ensure_schema_ready(conn, REQUIRED_TABLES)?;
        Ok(Self {
            conn,
            store,
            locks,
            owner: None,
        })
    }

    /// Scopes every call to notes owned by `user_id`.
    pub fn with_owner(mut self, user_id: impl Into<UserId>) -> Self {
        self.owner = Some(user_id.into());
        self
    }

    /// Lists the note's children ordered by position.
    pub fn list_children(&self, note_id: NoteId) -> ServiceResult<Vec<ChildDescriptor>> {
        self.read(note_id, |conn| describe_children(conn, &self.store, note_id))
    }

    /// Loads one child of the note.
    pub fn get_child(&self, note_id: NoteId, child_id: ChildId) -> ServiceResult<ChildDescriptor> {
        self.read(note_id, |conn| {
            let record = load_member(conn, note_id, child_id)?;
            describe(conn, &self.store, record)
        })
    }

    /// Creates a child at `position`, shifting occupants of that slot and
    /// after it up by one. A position past the end appends.
    pub fn create_child(
        &self,
        note_id: NoteId,
        content: ChildContent,
        position: u32,
    ) -> ServiceResult<ChildDescriptor> {
        content.validate().map_err(ServiceError::InvalidEntry)?;
        self.mutate("create_child", note_id, |conn| {
            let index = SqliteChildIndex::attach(conn);
            let position = position.min(index.next_position(note_id)?);
            insert_at(&index, note_id, position)?;

            let content_id = self.store.put(conn, &content)?;
            let record = ChildRecord {
                id: Uuid::new_v4(),
                note_id,
                variant: content.variant(),
                content_id,
                position,
            };
            index.insert(&record)?;

            Ok(ChildDescriptor {
                id: record.id,
                content,
                position,
            })
        })
    }

    /// Replaces a child's content in place. The position is unchanged.
    pub fn edit_child(
        &self,
        note_id: NoteId,
        child_id: ChildId,
        content: ChildContent,
    ) -> ServiceResult<ChildDescriptor> {
        content.validate().map_err(ServiceError::InvalidEntry)?;
        self.mutate("edit_child", note_id, |conn| {
            let record = load_member(conn, note_id, child_id)?;
            if record.variant != content.variant() {
                return Err(ServiceError::InvalidEntry(format!(
                    "child {child_id} is {} and cannot become {}",
                    record.variant,
                    content.variant()
                )));
            }
            if !self.store.overwrite(conn, record.content_id, &content)? {
                return Err(missing_content(&record));
            }
            SqliteChildIndex::attach(conn).touch(child_id)?;

            Ok(ChildDescriptor {
                id: child_id,
                content,
                position: record.position,
            })
        })
    }

    /// Moves a child to a free `position` without shifting anything.
    ///
    /// Fails with `PositionConflict` when another child holds `position`
    /// and with `InvalidEntry` when `position` lies past the last child.
    pub fn edit_child_position(
        &self,
        note_id: NoteId,
        child_id: ChildId,
        position: u32,
    ) -> ServiceResult<ChildDescriptor> {
        self.mutate("edit_child_position", note_id, |conn| {
            let index = SqliteChildIndex::attach(conn);
            let record = load_member(conn, note_id, child_id)?;
            if record.position != position {
                if index.is_occupied(note_id, position)? {
                    return Err(ServiceError::PositionConflict { note_id, position });
                }
                let next = index.next_position(note_id)?;
                if position >= next {
                    return Err(ServiceError::InvalidEntry(format!(
                        "position {position} is past the end of note {note_id} (next free slot {next})"
                    )));
                }
                index.set_position(child_id, position)?;
            }
            let moved = ChildRecord { position, ..record };
            describe(conn, &self.store, moved)
        })
    }

    /// Reorders a child to `target`, closing its old slot and opening the
    /// new one. A target past the end moves the child last.
    pub fn move_child(
        &self,
        note_id: NoteId,
        child_id: ChildId,
        target: u32,
    ) -> ServiceResult<ChildDescriptor> {
        self.mutate("move_child", note_id, |conn| {
            let index = SqliteChildIndex::attach(conn);
            let record = load_member(conn, note_id, child_id)?;

            index.park_child(child_id)?;
            remove_at(&index, note_id, record.position)?;
            let target = target.min(index.next_position(note_id)?);
            insert_at(&index, note_id, target)?;
            index.set_position(child_id, target)?;

            let moved = ChildRecord {
                position: target,
                ..record
            };
            describe(conn, &self.store, moved)
        })
    }

    /// Deletes a child and its content, then closes the gap it left.
    pub fn delete_child(&self, note_id: NoteId, child_id: ChildId) -> ServiceResult<()> {
        self.mutate("delete_child", note_id, |conn| {
            let index = SqliteChildIndex::attach(conn);
            let record = load_member(conn, note_id, child_id)?;

            self.store.delete(conn, record.variant, record.content_id)?;
            index.delete(child_id)?;
            remove_at(&index, note_id, record.position)?;
            Ok(())
        })
    }

    /// Replaces the note's children with `desired` and returns the result
    /// ordered by position.
    pub fn sync_children(
        &self,
        note_id: NoteId,
        desired: &[ChildSpec],
    ) -> ServiceResult<Vec<ChildDescriptor>> {
        self.sync_children_detailed(note_id, desired)
            .map(|outcome| outcome.children)
    }

    /// Same as [`Self::sync_children`] but also reports diff counts.
    pub fn sync_children_detailed(
        &self,
        note_id: NoteId,
        desired: &[ChildSpec],
    ) -> ServiceResult<SyncOutcome> {
        self.mutate("sync_children", note_id, |conn| {
            ReconciliationEngine::new(conn, &self.store).reconcile(note_id, desired)
        })
    }

    fn ensure_access(&self, conn: &Connection, note_id: NoteId) -> ServiceResult<()> {
        let notes = SqliteNoteRepository::attach(conn);
        let visible = match self.owner.as_deref() {
            Some(user_id) => notes.owns_note(user_id, note_id)?,
            None => notes.note_exists(note_id)?,
        };
        if visible {
            Ok(())
        } else {
            Err(ServiceError::NotFound(Missing::Note(note_id)))
        }
    }

    fn read<T>(
        &self,
        note_id: NoteId,
        f: impl FnOnce(&Connection) -> ServiceResult<T>,
    ) -> ServiceResult<T> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)?;
        self.ensure_access(&tx, note_id)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    fn mutate<T>(
        &self,
        op: &'static str,
        note_id: NoteId,
        f: impl FnOnce(&Connection) -> ServiceResult<T>,
    ) -> ServiceResult<T> {
        let started_at = Instant::now();
        let result = self.locks.with_note(note_id, || {
            // Dropping `tx` on an early return rolls back every write of `f`.
            let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
            self.ensure_access(&tx, note_id)?;
            let value = f(&tx)?;
            SqliteNoteRepository::attach(&tx).touch_note(note_id)?;
            tx.commit()?;
            Ok(value)
        });
        log_outcome(op, note_id, started_at, &result);
        result
    }
}

/// Resolves every child of the note into descriptors ordered by position.
pub(crate) fn describe_children<S: ContentStore>(
    conn: &Connection,
    store: &S,
    note_id: NoteId,
) -> ServiceResult<Vec<ChildDescriptor>> {
    SqliteChildIndex::attach(conn)
        .list_by_note(note_id)?
        .into_iter()
        .map(|record| describe(conn, store, record))
        .collect()
}

fn describe<S: ContentStore>(
    conn: &Connection,
    store: &S,
    record: ChildRecord,
) -> ServiceResult<ChildDescriptor> {
    let content = store
        .load(conn, record.variant, record.content_id)?
        .ok_or_else(|| missing_content(&record))?;
    Ok(ChildDescriptor {
        id: record.id,
        content,
        position: record.position,
    })
}

fn load_member(conn: &Connection, note_id: NoteId, child_id: ChildId) -> ServiceResult<ChildRecord> {
    match SqliteChildIndex::attach(conn).get(child_id)? {
        Some(record) if record.note_id == note_id => Ok(record),
        _ => Err(ServiceError::NotFound(Missing::Child(child_id))),
    }
}

fn log_outcome<T>(op: &str, note_id: NoteId, started_at: Instant, result: &ServiceResult<T>) {
    let duration_ms = started_at.elapsed().as_millis();
    match result {
        Ok(_) => info!(
            "event=child_mutation module=service status=ok op={} note_id={} duration_ms={}",
            op, note_id, duration_ms
        ),
        Err(err @ (ServiceError::StorageFailure(_) | ServiceError::Internal(_))) => error!(
            "event=child_mutation module=service status=error op={} note_id={} duration_ms={} error_code={} error={}",
            op,
            note_id,
            duration_ms,
            err.code(),
            err
        ),
        Err(err) => warn!(
            "event=child_mutation module=service status=error op={} note_id={} duration_ms={} error_code={}",
            op,
            note_id,
            duration_ms,
            err.code()
        ),
    }
}
