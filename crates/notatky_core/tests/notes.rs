use notatky_core::db::open_db_in_memory;
use notatky_core::{
    ChildContent, Missing, NoteChildService, NoteLocks, NoteService, ServiceError,
};
use rusqlite::Connection;

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn notes_are_listed_per_user_most_recent_first() {
    let conn = open_db_in_memory().unwrap();
    let notes = NoteService::try_new(&conn, NoteLocks::new()).unwrap();

    let older = notes.create_note("alice", "Older").unwrap();
    let newer = notes.create_note("alice", "Newer").unwrap();
    notes.create_note("bob", "Bob's").unwrap();

    conn.execute(
        "UPDATE notes SET last_interacted_at = 1000 WHERE id = ?1;",
        [older.id.to_string()],
    )
    .unwrap();
    conn.execute(
        "UPDATE notes SET last_interacted_at = 2000 WHERE id = ?1;",
        [newer.id.to_string()],
    )
    .unwrap();

    let listed: Vec<_> = notes
        .list_notes_for_user("alice")
        .unwrap()
        .into_iter()
        .map(|note| note.title)
        .collect();
    assert_eq!(listed, vec!["Newer".to_string(), "Older".to_string()]);
    assert!(notes.list_notes_for_user("carol").unwrap().is_empty());
}

#[test]
fn child_mutation_moves_note_to_top() {
    let conn = open_db_in_memory().unwrap();
    let locks = NoteLocks::new();
    let notes = NoteService::try_new(&conn, locks.clone()).unwrap();
    let first = notes.create_note("alice", "First").unwrap();
    let second = notes.create_note("alice", "Second").unwrap();
    conn.execute("UPDATE notes SET last_interacted_at = 1;", [])
        .unwrap();

    NoteChildService::try_new(&conn, locks)
        .unwrap()
        .create_child(first.id, ChildContent::text("bump"), 0)
        .unwrap();

    let listed: Vec<_> = notes
        .list_notes_for_user("alice")
        .unwrap()
        .into_iter()
        .map(|note| note.id)
        .collect();
    assert_eq!(listed, vec![first.id, second.id]);
}

#[test]
fn rename_validates_title_and_ownership() {
    let conn = open_db_in_memory().unwrap();
    let notes = NoteService::try_new(&conn, NoteLocks::new()).unwrap();
    let note = notes.create_note("alice", "Draft").unwrap();

    let renamed = notes.rename_note("alice", note.id, "  Final  ").unwrap();
    assert_eq!(renamed.title, "Final");

    assert!(matches!(
        notes.rename_note("alice", note.id, "   "),
        Err(ServiceError::InvalidEntry(_))
    ));
    assert!(matches!(
        notes.rename_note("bob", note.id, "Hijacked"),
        Err(ServiceError::NotFound(Missing::Note(_)))
    ));
    assert!(matches!(
        notes.get_note("bob", note.id),
        Err(ServiceError::NotFound(Missing::Note(_)))
    ));
    assert_eq!(notes.get_note("alice", note.id).unwrap().title, "Final");
}

#[test]
fn blank_title_is_rejected_on_create() {
    let conn = open_db_in_memory().unwrap();
    let notes = NoteService::try_new(&conn, NoteLocks::new()).unwrap();

    assert!(matches!(
        notes.create_note("alice", ""),
        Err(ServiceError::InvalidEntry(_))
    ));
    assert_eq!(count(&conn, "notes"), 0);
}

#[test]
fn delete_note_cascades_to_children_and_contents() {
    let conn = open_db_in_memory().unwrap();
    let locks = NoteLocks::new();
    let notes = NoteService::try_new(&conn, locks.clone()).unwrap();
    let doomed = notes.create_note("alice", "Doomed").unwrap();
    let survivor = notes.create_note("alice", "Survivor").unwrap();

    let children = NoteChildService::try_new(&conn, locks).unwrap();
    children
        .create_child(doomed.id, ChildContent::text("a"), 0)
        .unwrap();
    children
        .create_child(doomed.id, ChildContent::image("blobs/a.png"), 1)
        .unwrap();
    children
        .create_child(survivor.id, ChildContent::text("keep"), 0)
        .unwrap();

    assert!(matches!(
        notes.delete_note("bob", doomed.id),
        Err(ServiceError::NotFound(Missing::Note(_)))
    ));

    let removed = notes.delete_note("alice", doomed.id).unwrap();
    assert_eq!(removed, 2);

    assert_eq!(count(&conn, "note_children"), 1);
    assert_eq!(count(&conn, "text_contents"), 1);
    assert_eq!(count(&conn, "image_contents"), 0);
    assert_eq!(count(&conn, "user_notes"), 1);
    assert!(matches!(
        children.list_children(doomed.id),
        Err(ServiceError::NotFound(Missing::Note(_)))
    ));
    assert_eq!(children.list_children(survivor.id).unwrap().len(), 1);
}
