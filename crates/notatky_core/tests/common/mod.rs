//! Helpers shared by the integration tests.
#![allow(dead_code)]

use notatky_core::repo::content_store::{ImageContent, TextContent};
use notatky_core::{
    ChildContent, ChildVariant, ContentStore, RepoError, RepoResult, SqliteContentStore,
};
use rusqlite::Connection;
use std::cell::Cell;
use uuid::Uuid;

/// Content store that delegates to SQLite until a configured write fails.
///
/// Reads and deletes always go through.
#[derive(Debug, Default)]
pub struct FailingStore {
    puts: Cell<usize>,
    fail_on_put: Option<usize>,
    fail_overwrite: bool,
}

impl FailingStore {
    /// Every write fails.
    pub fn all_writes() -> Self {
        Self {
            fail_on_put: Some(1),
            fail_overwrite: true,
            ..Self::default()
        }
    }

    /// The `nth` put (1-based) and every later one fail.
    pub fn on_put(nth: usize) -> Self {
        Self {
            fail_on_put: Some(nth),
            ..Self::default()
        }
    }

    fn next_put(&self) -> RepoResult<()> {
        let attempt = self.puts.get() + 1;
        self.puts.set(attempt);
        match self.fail_on_put {
            Some(nth) if attempt >= nth => Err(unavailable()),
            _ => Ok(()),
        }
    }
}

fn unavailable() -> RepoError {
    RepoError::Backend("content backend unavailable".to_string())
}

impl ContentStore for FailingStore {
    fn put_text(&self, conn: &Connection, text: &str) -> RepoResult<Uuid> {
        self.next_put()?;
        SqliteContentStore.put_text(conn, text)
    }

    fn get_text(&self, conn: &Connection, id: Uuid) -> RepoResult<Option<TextContent>> {
        SqliteContentStore.get_text(conn, id)
    }

    fn put_image(&self, conn: &Connection, blob_ref: &str) -> RepoResult<Uuid> {
        self.next_put()?;
        SqliteContentStore.put_image(conn, blob_ref)
    }

    fn get_image(&self, conn: &Connection, id: Uuid) -> RepoResult<Option<ImageContent>> {
        SqliteContentStore.get_image(conn, id)
    }

    fn overwrite(&self, conn: &Connection, id: Uuid, content: &ChildContent) -> RepoResult<bool> {
        if self.fail_overwrite {
            return Err(unavailable());
        }
        SqliteContentStore.overwrite(conn, id, content)
    }

    fn delete(&self, conn: &Connection, variant: ChildVariant, id: Uuid) -> RepoResult<()> {
        SqliteContentStore.delete(conn, variant, id)
    }
}
