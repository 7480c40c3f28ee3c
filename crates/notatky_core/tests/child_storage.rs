use notatky_core::db::open_db_in_memory;
use notatky_core::repo::child_index::SqliteChildIndex;
use notatky_core::repo::content_store::{ContentStore, SqliteContentStore};
use notatky_core::{ChildContent, ChildRecord, ChildVariant};
use rusqlite::Connection;
use uuid::Uuid;

fn record(note_id: Uuid, position: u32) -> ChildRecord {
    ChildRecord {
        id: Uuid::new_v4(),
        note_id,
        variant: ChildVariant::Text,
        content_id: Uuid::new_v4(),
        position,
    }
}

fn positions(index: &SqliteChildIndex<'_>, note_id: Uuid) -> Vec<u32> {
    index
        .list_by_note(note_id)
        .unwrap()
        .into_iter()
        .map(|record| record.position)
        .collect()
}

#[test]
fn content_store_roundtrips_and_overwrites_in_place() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteContentStore;

    let text_id = store.put_text(&conn, "first draft").unwrap();
    let image_id = store.put_image(&conn, "blobs/cat.png").unwrap();

    assert_eq!(
        store.get_text(&conn, text_id).unwrap().unwrap().text,
        "first draft"
    );
    assert_eq!(
        store.get_image(&conn, image_id).unwrap().unwrap().blob_ref,
        "blobs/cat.png"
    );

    assert!(store
        .overwrite(&conn, text_id, &ChildContent::text("second draft"))
        .unwrap());
    assert_eq!(
        store.load(&conn, ChildVariant::Text, text_id).unwrap(),
        Some(ChildContent::text("second draft"))
    );

    // An image payload never lands on a text id.
    assert!(!store
        .overwrite(&conn, text_id, &ChildContent::image("blobs/dog.png"))
        .unwrap());

    store.delete(&conn, ChildVariant::Image, image_id).unwrap();
    assert!(store.get_image(&conn, image_id).unwrap().is_none());
}

#[test]
fn index_queries_are_scoped_to_one_note() {
    let conn = open_db_in_memory().unwrap();
    let index = SqliteChildIndex::try_new(&conn).unwrap();
    let note_a = Uuid::new_v4();
    let note_b = Uuid::new_v4();

    for position in [2, 0, 1] {
        index.insert(&record(note_a, position)).unwrap();
    }
    index.insert(&record(note_b, 0)).unwrap();

    assert_eq!(positions(&index, note_a), vec![0, 1, 2]);
    assert_eq!(positions(&index, note_b), vec![0]);
    assert_eq!(index.next_position(note_a).unwrap(), 3);
    assert_eq!(index.next_position(Uuid::new_v4()).unwrap(), 0);

    assert!(index.is_occupied(note_a, 1).unwrap());
    assert!(!index.is_occupied(note_b, 1).unwrap());

    let tail: Vec<u32> = index
        .list_from_position(note_a, 1)
        .unwrap()
        .into_iter()
        .map(|record| record.position)
        .collect();
    assert_eq!(tail, vec![1, 2]);

    let at_two = index.find_at(note_a, 2).unwrap().unwrap();
    assert_eq!(index.get(at_two.id).unwrap(), Some(at_two));
}

#[test]
fn parking_frees_every_slot_of_the_note() {
    let conn = open_db_in_memory().unwrap();
    let index = SqliteChildIndex::try_new(&conn).unwrap();
    let note_id = Uuid::new_v4();
    let first = record(note_id, 0);
    let second = record(note_id, 1);
    index.insert(&first).unwrap();
    index.insert(&second).unwrap();

    assert_eq!(index.park_note(note_id).unwrap(), 2);
    assert_eq!(index.next_position(note_id).unwrap(), 0);

    // Swap through the freed range.
    assert!(index.set_position(first.id, 1).unwrap());
    assert!(index.set_position(second.id, 0).unwrap());

    let ordered: Vec<Uuid> = index
        .list_by_note(note_id)
        .unwrap()
        .into_iter()
        .map(|record| record.id)
        .collect();
    assert_eq!(ordered, vec![second.id, first.id]);
}

#[test]
fn corrupt_variant_is_reported_as_invalid_data() {
    let conn = open_db_in_memory().unwrap();
    let note_id = Uuid::new_v4();
    corrupt_row(&conn, note_id);

    let index = SqliteChildIndex::try_new(&conn).unwrap();
    let err = index.list_by_note(note_id).unwrap_err();
    assert!(matches!(err, notatky_core::RepoError::InvalidData(_)));
}

fn corrupt_row(conn: &Connection, note_id: Uuid) {
    conn.execute_batch("PRAGMA ignore_check_constraints = ON;")
        .unwrap();
    conn.execute(
        "INSERT INTO note_children (id, note_id, variant, content_id, position)
         VALUES (?1, ?2, 'video', ?3, 0);",
        [
            Uuid::new_v4().to_string(),
            note_id.to_string(),
            Uuid::new_v4().to_string(),
        ],
    )
    .unwrap();
}
