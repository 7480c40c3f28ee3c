//! Content store: keyed persistence for child payloads.
//!
//! # Responsibility
//! - Persist text bodies and image blob references under their own ids.
//! - Carry no ordering knowledge; positions live in the child index.
//!
//! # Invariants
//! - Every call runs on the connection passed in, so a service can put the
//!   content write and the child index write into one transaction.
//! - Overwrites keep the content id stable.

use crate::model::child::{ChildContent, ChildVariant, ContentId};
use crate::repo::{parse_uuid, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

/// Stored text payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextContent {
    pub id: ContentId,
    pub text: String,
}

/// Stored image payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageContent {
    pub id: ContentId,
    pub blob_ref: String,
}

/// Keyed storage for child content.
pub trait ContentStore {
    /// Stores a text body and returns its new id.
    fn put_text(&self, conn: &Connection, text: &str) -> RepoResult<ContentId>;
    /// Loads a text body.
    fn get_text(&self, conn: &Connection, id: ContentId) -> RepoResult<Option<TextContent>>;
    /// Stores an image reference and returns its new id.
    fn put_image(&self, conn: &Connection, blob_ref: &str) -> RepoResult<ContentId>;
    /// Loads an image reference.
    fn get_image(&self, conn: &Connection, id: ContentId) -> RepoResult<Option<ImageContent>>;
    /// Replaces the payload behind `id`. Returns `false` when `id` is unknown
    /// for the content's variant.
    fn overwrite(&self, conn: &Connection, id: ContentId, content: &ChildContent)
        -> RepoResult<bool>;
    /// Removes the payload behind `id`.
    fn delete(&self, conn: &Connection, variant: ChildVariant, id: ContentId) -> RepoResult<()>;

    /// Stores any payload, dispatching on its variant.
    fn put(&self, conn: &Connection, content: &ChildContent) -> RepoResult<ContentId> {
        match content {
            ChildContent::Text(text) => self.put_text(conn, text),
            ChildContent::Image(blob_ref) => self.put_image(conn, blob_ref),
        }
    }

    /// Loads any payload as `ChildContent`.
    fn load(
        &self,
        conn: &Connection,
        variant: ChildVariant,
        id: ContentId,
    ) -> RepoResult<Option<ChildContent>> {
        Ok(match variant {
            ChildVariant::Text => self
                .get_text(conn, id)?
                .map(|content| ChildContent::Text(content.text)),
            ChildVariant::Image => self
                .get_image(conn, id)?
                .map(|content| ChildContent::Image(content.blob_ref)),
        })
    }
}

/// Content store backed by the `text_contents` / `image_contents` tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteContentStore;

impl ContentStore for SqliteContentStore {
    fn put_text(&self, conn: &Connection, text: &str) -> RepoResult<ContentId> {
        let id = Uuid::new_v4();
        conn.execute(
            "INSERT INTO text_contents (id, text) VALUES (?1, ?2);",
            params![id.to_string(), text],
        )?;
        Ok(id)
    }

    fn get_text(&self, conn: &Connection, id: ContentId) -> RepoResult<Option<TextContent>> {
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT id, text FROM text_contents WHERE id = ?1;",
                [id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        row.map(|(id_text, text)| -> RepoResult<TextContent> {
            Ok(TextContent {
                id: parse_uuid(&id_text, "text_contents.id")?,
                text,
            })
        })
        .transpose()
    }

    fn put_image(&self, conn: &Connection, blob_ref: &str) -> RepoResult<ContentId> {
        let id = Uuid::new_v4();
        conn.execute(
            "INSERT INTO image_contents (id, blob_ref) VALUES (?1, ?2);",
            params![id.to_string(), blob_ref],
        )?;
        Ok(id)
    }

    fn get_image(&self, conn: &Connection, id: ContentId) -> RepoResult<Option<ImageContent>> {
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT id, blob_ref FROM image_contents WHERE id = ?1;",
                [id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        row.map(|(id_text, blob_ref)| -> RepoResult<ImageContent> {
            Ok(ImageContent {
                id: parse_uuid(&id_text, "image_contents.id")?,
                blob_ref,
            })
        })
        .transpose()
    }

    fn overwrite(
        &self,
        conn: &Connection,
        id: ContentId,
        content: &ChildContent,
    ) -> RepoResult<bool> {
        let changed = match content {
            ChildContent::Text(text) => conn.execute(
                "UPDATE text_contents SET text = ?2 WHERE id = ?1;",
                params![id.to_string(), text],
            )?,
            ChildContent::Image(blob_ref) => conn.execute(
                "UPDATE image_contents SET blob_ref = ?2 WHERE id = ?1;",
                params![id.to_string(), blob_ref],
            )?,
        };
        Ok(changed == 1)
    }

    fn delete(&self, conn: &Connection, variant: ChildVariant, id: ContentId) -> RepoResult<()> {
        let sql = match variant {
            ChildVariant::Text => "DELETE FROM text_contents WHERE id = ?1;",
            ChildVariant::Image => "DELETE FROM image_contents WHERE id = ?1;",
        };
        conn.execute(sql, [id.to_string()])?;
        Ok(())
    }
}
