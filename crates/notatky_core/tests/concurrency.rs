use notatky_core::db::open_db;
use notatky_core::{ChildContent, NoteChildService, NoteLocks, NoteService};
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

const WORKERS: usize = 4;
const CREATES_PER_WORKER: usize = 10;

#[test]
fn concurrent_creates_on_one_note_keep_positions_unique_and_dense() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("concurrency.db");
    let locks = NoteLocks::new();

    let note_id = {
        let conn = open_db(&path).unwrap();
        NoteService::try_new(&conn, locks.clone())
            .unwrap()
            .create_note("alice", "Shared")
            .unwrap()
            .id
    };

    let barrier = Arc::new(Barrier::new(WORKERS));
    let handles: Vec<_> = (0..WORKERS)
        .map(|worker| {
            let path = path.clone();
            let locks = locks.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let conn = open_db(&path).unwrap();
                let service = NoteChildService::try_new(&conn, locks).unwrap();
                barrier.wait();
                for step in 0..CREATES_PER_WORKER {
                    // Everyone aims for the front so every call shifts.
                    service
                        .create_child(note_id, ChildContent::text(format!("w{worker}-{step}")), 0)
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let conn = open_db(&path).unwrap();
    let children = NoteChildService::try_new(&conn, locks.clone())
        .unwrap()
        .list_children(note_id)
        .unwrap();

    let positions: Vec<u32> = children.iter().map(|child| child.position).collect();
    let expected: Vec<u32> = (0..(WORKERS * CREATES_PER_WORKER) as u32).collect();
    assert_eq!(positions, expected);

    let ids: HashSet<_> = children.iter().map(|child| child.id).collect();
    assert_eq!(ids.len(), WORKERS * CREATES_PER_WORKER);
    assert_eq!(locks.active_entries(), 0);
}
