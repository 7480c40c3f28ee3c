//! notatky command-line entry point.
//!
//! # Responsibility
//! - Map subcommands onto note and note-child service calls.
//! - Print results as JSON in the client wire shape.

mod cli;
mod error;

use std::io::{self, Read};
use std::process::ExitCode;

use clap::Parser;
use log::info;
use notatky_core::wire::{parse_sync_request, to_wire, WireNoteChild};
use notatky_core::{
    init_from_config, ChildContent, CoreConfig, NoteChildService, NoteLocks, NoteService,
    MAX_POSITION,
};
use serde::Serialize;

use crate::cli::{Cli, Commands};
use crate::error::CliError;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = CoreConfig::from_env()?;
    if let Some(db_path) = cli.db_path {
        config.db_path = db_path;
        config.validate()?;
    }
    init_from_config(&config)?;
    info!("event=cli_start module=cli status=ok version={}", notatky_core::core_version());

    let conn = config.open_database()?;
    let locks = NoteLocks::new();
    let user = cli.user.as_str();
    let notes = NoteService::try_new(&conn, locks.clone())?;
    let children = NoteChildService::try_new(&conn, locks)?.with_owner(user);

    match cli.command {
        Commands::Notes => print_json(&notes.list_notes_for_user(user)?),
        Commands::NewNote { title } => print_json(&notes.create_note(user, &title)?),
        Commands::RenameNote { note_id, title } => {
            print_json(&notes.rename_note(user, note_id, &title)?)
        }
        Commands::DeleteNote { note_id } => {
            let removed = notes.delete_note(user, note_id)?;
            print_json(&serde_json::json!({ "deleted": note_id, "childrenRemoved": removed }))
        }
        Commands::Children { note_id } => {
            print_json(&to_wire(children.list_children(note_id)?))
        }
        Commands::AddText {
            note_id,
            text,
            position,
        } => {
            let child = children.create_child(
                note_id,
                ChildContent::text(text),
                position.unwrap_or(MAX_POSITION),
            )?;
            print_json(&WireNoteChild::from(child))
        }
        Commands::AddImage {
            note_id,
            image_path,
            position,
        } => {
            let child = children.create_child(
                note_id,
                ChildContent::image(image_path),
                position.unwrap_or(MAX_POSITION),
            )?;
            print_json(&WireNoteChild::from(child))
        }
        Commands::EditText {
            note_id,
            child_id,
            text,
        } => {
            let child = children.edit_child(note_id, child_id, ChildContent::text(text))?;
            print_json(&WireNoteChild::from(child))
        }
        Commands::EditImage {
            note_id,
            child_id,
            image_path,
        } => {
            let child = children.edit_child(note_id, child_id, ChildContent::image(image_path))?;
            print_json(&WireNoteChild::from(child))
        }
        Commands::Move {
            note_id,
            child_id,
            position,
        } => {
            let child = children.move_child(note_id, child_id, position)?;
            print_json(&WireNoteChild::from(child))
        }
        Commands::Reposition {
            note_id,
            child_id,
            position,
        } => {
            let child = children.edit_child_position(note_id, child_id, position)?;
            print_json(&WireNoteChild::from(child))
        }
        Commands::DeleteChild { note_id, child_id } => {
            children.delete_child(note_id, child_id)?;
            print_json(&to_wire(children.list_children(note_id)?))
        }
        Commands::Sync { note_id, file } => {
            let body = match file {
                Some(path) => std::fs::read_to_string(path)?,
                None => {
                    let mut buffer = String::new();
                    io::stdin().read_to_string(&mut buffer)?;
                    buffer
                }
            };
            let desired = parse_sync_request(&body)?;
            print_json(&to_wire(children.sync_children(note_id, &desired)?))
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
