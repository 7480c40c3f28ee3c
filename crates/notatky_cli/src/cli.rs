use std::path::PathBuf;

use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "notatky")]
#[command(about = "Manage notes and their ordered children from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database file (overrides NOTATKY_DB_PATH)
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Acting user id; notes of other users stay invisible
    #[arg(long, global = true, default_value = "local", value_name = "USER")]
    pub user: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List notes of the acting user
    Notes,
    /// Create a note
    NewNote {
        /// Note title
        title: String,
    },
    /// Rename a note
    RenameNote { note_id: Uuid, title: String },
    /// Delete a note with all of its children
    DeleteNote { note_id: Uuid },
    /// List children of a note in position order
    Children { note_id: Uuid },
    /// Insert a text child, shifting later children
    AddText {
        note_id: Uuid,
        text: String,
        /// Target position (appends when omitted)
        #[arg(short, long)]
        position: Option<u32>,
    },
    /// Insert an image child, shifting later children
    AddImage {
        note_id: Uuid,
        /// Blob reference of the image
        image_path: String,
        #[arg(short, long)]
        position: Option<u32>,
    },
    /// Replace a text child's content
    EditText {
        note_id: Uuid,
        child_id: Uuid,
        text: String,
    },
    /// Point an image child at a different blob
    EditImage {
        note_id: Uuid,
        child_id: Uuid,
        /// New blob reference of the image
        image_path: String,
    },
    /// Move a child to a new position, shifting siblings
    Move {
        note_id: Uuid,
        child_id: Uuid,
        position: u32,
    },
    /// Put a child into a free position without shifting siblings
    Reposition {
        note_id: Uuid,
        child_id: Uuid,
        position: u32,
    },
    /// Delete a child and close the gap
    DeleteChild { note_id: Uuid, child_id: Uuid },
    /// Replace all children from a `{ "noteChildren": [...] }` document
    Sync {
        note_id: Uuid,
        /// JSON file to read (stdin when omitted)
        #[arg(short, long, value_name = "PATH")]
        file: Option<PathBuf>,
    },
}
