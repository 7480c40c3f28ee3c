//! Child index: persistence of positioned child records.
//!
//! # Responsibility
//! - Store `{id, note_id, variant, content_id, position}` rows.
//! - Answer note-scoped queries: by note, by note+position, by
//!   note+position>=k.
//!
//! # Invariants
//! - Listing is deterministic: `position ASC, id ASC`.
//! - `(note_id, position)` is unique at the storage level; callers that move
//!   many rows at once must order their writes (or park rows) so no
//!   intermediate state collides.
//! - Negative positions exist only transiently inside a sync transaction.

use crate::model::child::{ChildId, ChildRecord, ChildVariant};
use crate::model::note::NoteId;
use crate::repo::{ensure_schema_ready, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const CHILD_SELECT_SQL: &str = "SELECT
    id,
    note_id,
    variant,
    content_id,
    position
FROM note_children";

/// SQLite-backed child index.
pub struct SqliteChildIndex<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteChildIndex<'conn> {
    /// Creates an index from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn, &["note_children"])?;
        Ok(Self { conn })
    }

    /// Wraps a connection (usually a transaction) already checked by the caller.
    pub(crate) fn attach(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Persists a new record.
    pub fn insert(&self, record: &ChildRecord) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO note_children (
                id,
                note_id,
                variant,
                content_id,
                position
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                record.id.to_string(),
                record.note_id.to_string(),
                record.variant.as_str(),
                record.content_id.to_string(),
                i64::from(record.position),
            ],
        )?;
        Ok(())
    }

    /// Loads one record by id regardless of note.
    pub fn get(&self, child_id: ChildId) -> RepoResult<Option<ChildRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CHILD_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([child_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_child_row(row)?));
        }
        Ok(None)
    }

    /// Lists all records of one note ordered by position.
    pub fn list_by_note(&self, note_id: NoteId) -> RepoResult<Vec<ChildRecord>> {
        self.query_records(
            &format!("{CHILD_SELECT_SQL} WHERE note_id = ?1 ORDER BY position ASC, id ASC;"),
            params![note_id.to_string()],
        )
    }

    /// Returns the record occupying `position` in the note, if any.
    pub fn find_at(&self, note_id: NoteId, position: u32) -> RepoResult<Option<ChildRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CHILD_SELECT_SQL} WHERE note_id = ?1 AND position = ?2;"
        ))?;
        let mut rows = stmt.query(params![note_id.to_string(), i64::from(position)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_child_row(row)?));
        }
        Ok(None)
    }

    /// Returns whether any record of the note occupies `position`.
    pub fn is_occupied(&self, note_id: NoteId, position: u32) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM note_children
                WHERE note_id = ?1 AND position = ?2
            );",
            params![note_id.to_string(), i64::from(position)],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    /// Lists records of the note with `position >= from`, ascending.
    pub fn list_from_position(&self, note_id: NoteId, from: u32) -> RepoResult<Vec<ChildRecord>> {
        self.query_records(
            &format!(
                "{CHILD_SELECT_SQL}
                 WHERE note_id = ?1 AND position >= ?2
                 ORDER BY position ASC, id ASC;"
            ),
            params![note_id.to_string(), i64::from(from)],
        )
    }

    /// Returns one past the highest occupied position (`0` for an empty note).
    ///
    /// Equals the child count while positions are dense.
    pub fn next_position(&self, note_id: NoteId) -> RepoResult<u32> {
        let next: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(position), -1) + 1
             FROM note_children
             WHERE note_id = ?1
               AND position >= 0;",
            [note_id.to_string()],
            |row| row.get(0),
        )?;
        u32::try_from(next)
            .map_err(|_| RepoError::InvalidData(format!("next position {next} out of range")))
    }

    /// Moves one record to `position`.
    pub fn set_position(&self, child_id: ChildId, position: u32) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE note_children
             SET position = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![child_id.to_string(), i64::from(position)],
        )?;
        Ok(changed == 1)
    }

    /// Bumps `updated_at` after a content-only edit.
    pub fn touch(&self, child_id: ChildId) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE note_children
             SET updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            [child_id.to_string()],
        )?;
        Ok(changed == 1)
    }

    /// Maps every position `p` of the note to `-1 - p`.
    ///
    /// The mapping is injective and lands outside the non-negative range, so
    /// it never collides, and frees every non-negative slot of the note.
    pub fn park_note(&self, note_id: NoteId) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE note_children
             SET position = -1 - position
             WHERE note_id = ?1
               AND position >= 0;",
            [note_id.to_string()],
        )?;
        Ok(changed)
    }

    /// Moves one record out of the non-negative range (`p -> -1 - p`), freeing
    /// its slot while the caller rearranges its siblings.
    pub fn park_child(&self, child_id: ChildId) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE note_children
             SET position = -1 - position
             WHERE id = ?1
               AND position >= 0;",
            [child_id.to_string()],
        )?;
        Ok(changed == 1)
    }

    /// Deletes one record. Returns `false` when it did not exist.
    pub fn delete(&self, child_id: ChildId) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM note_children WHERE id = ?1;",
            [child_id.to_string()],
        )?;
        Ok(changed == 1)
    }

    /// Deletes every record of the note.
    pub fn delete_by_note(&self, note_id: NoteId) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "DELETE FROM note_children WHERE note_id = ?1;",
            [note_id.to_string()],
        )?;
        Ok(changed)
    }

    fn query_records(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> RepoResult<Vec<ChildRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_child_row(row)?);
        }
        Ok(records)
    }
}

fn parse_child_row(row: &Row<'_>) -> RepoResult<ChildRecord> {
    let id_text: String = row.get("id")?;
    let note_id_text: String = row.get("note_id")?;
    let content_id_text: String = row.get("content_id")?;

    let variant_text: String = row.get("variant")?;
    let variant = ChildVariant::parse(&variant_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid child variant `{variant_text}` in note_children.variant"
        ))
    })?;

    let raw_position: i64 = row.get("position")?;
    let position = u32::try_from(raw_position).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid position `{raw_position}` in note_children.position"
        ))
    })?;

    Ok(ChildRecord {
        id: parse_uuid(&id_text, "note_children.id")?,
        note_id: parse_uuid(&note_id_text, "note_children.note_id")?,
        variant,
        content_id: parse_uuid(&content_id_text, "note_children.content_id")?,
        position,
    })
}
