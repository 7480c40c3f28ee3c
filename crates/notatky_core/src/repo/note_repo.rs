//! Note repository: note rows and user ownership links.
//!
//! # Responsibility
//! - Persist notes and their `user_notes` ownership links.
//! - Answer `owns_note(user_id, note_id)` for the service layer.
//!
//! # Invariants
//! - Note list is sorted by `last_interacted_at DESC, id ASC`.
//! - Deleting a note here removes only the note and its ownership links;
//!   children are cascaded explicitly by the note service beforehand.

use crate::model::note::{Note, NoteId};
use crate::repo::{ensure_schema_ready, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const NOTE_SELECT_SQL: &str = "SELECT
    n.id AS id,
    n.title AS title,
    n.last_interacted_at AS last_interacted_at
FROM notes n";

/// SQLite-backed note repository.
pub struct SqliteNoteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNoteRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn, &["notes", "user_notes"])?;
        Ok(Self { conn })
    }

    pub(crate) fn attach(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Inserts a note and links it to its owner.
    pub fn create_note(&self, note_id: NoteId, owner: &str, title: &str) -> RepoResult<Note> {
        self.conn.execute(
            "INSERT INTO notes (id, title) VALUES (?1, ?2);",
            params![note_id.to_string(), title],
        )?;
        self.conn.execute(
            "INSERT INTO user_notes (user_id, note_id) VALUES (?1, ?2);",
            params![owner, note_id.to_string()],
        )?;
        self.get_note(note_id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("note {note_id} missing after insert"))
        })
    }

    /// Loads one note.
    pub fn get_note(&self, note_id: NoteId) -> RepoResult<Option<Note>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTE_SELECT_SQL} WHERE n.id = ?1;"))?;
        let mut rows = stmt.query([note_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_note_row(row)?));
        }
        Ok(None)
    }

    /// Returns whether the note exists.
    pub fn note_exists(&self, note_id: NoteId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM notes WHERE id = ?1);",
            [note_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    /// Returns whether `user_id` owns the note.
    pub fn owns_note(&self, user_id: &str, note_id: NoteId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM user_notes u
                INNER JOIN notes n ON n.id = u.note_id
                WHERE u.user_id = ?1
                  AND u.note_id = ?2
            );",
            params![user_id, note_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    /// Lists notes owned by `user_id`, most recently touched first.
    pub fn list_notes_for_user(&self, user_id: &str) -> RepoResult<Vec<Note>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NOTE_SELECT_SQL}
             INNER JOIN user_notes u ON u.note_id = n.id
             WHERE u.user_id = ?1
             ORDER BY n.last_interacted_at DESC, n.id ASC;"
        ))?;
        let mut rows = stmt.query([user_id])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }
        Ok(notes)
    }

    /// Replaces the title and touches the interaction timestamp.
    pub fn rename_note(&self, note_id: NoteId, title: &str) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE notes
             SET title = ?2,
                 last_interacted_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![note_id.to_string(), title],
        )?;
        Ok(changed == 1)
    }

    /// Marks the note as interacted with now.
    pub fn touch_note(&self, note_id: NoteId) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE notes
             SET last_interacted_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            [note_id.to_string()],
        )?;
        Ok(changed == 1)
    }

    /// Deletes ownership links and the note row.
    pub fn delete_note(&self, note_id: NoteId) -> RepoResult<bool> {
        self.conn.execute(
            "DELETE FROM user_notes WHERE note_id = ?1;",
            [note_id.to_string()],
        )?;
        let changed = self
            .conn
            .execute("DELETE FROM notes WHERE id = ?1;", [note_id.to_string()])?;
        Ok(changed == 1)
    }
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    let id_text: String = row.get("id")?;
    Ok(Note {
        id: parse_uuid(&id_text, "notes.id")?,
        title: row.get("title")?,
        last_interacted_at: row.get("last_interacted_at")?,
    })
}
