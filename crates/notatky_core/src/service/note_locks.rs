//! Per-note serialization boundary.
//!
//! # Responsibility
//! - Hand out one mutex per note id so mutations of the same note never
//!   interleave, while different notes proceed in parallel.
//!
//! # Invariants
//! - Entries are created on demand and dropped once no caller holds them.
//! - The registry map is only locked long enough to fetch or prune an entry.

use crate::model::note::NoteId;
use crate::service::error::{ServiceError, ServiceResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Shared registry of per-note locks. Clones share the same registry.
#[derive(Debug, Clone, Default)]
pub struct NoteLocks {
    inner: Arc<Mutex<HashMap<NoteId, Arc<Mutex<()>>>>>,
}

impl NoteLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` while holding the lock of `note_id`.
    pub fn with_note<T>(
        &self,
        note_id: NoteId,
        f: impl FnOnce() -> ServiceResult<T>,
    ) -> ServiceResult<T> {
        let entry = self.entry(note_id)?;
        let result = {
            let _guard = entry
                .lock()
                .map_err(|_| ServiceError::Internal(format!("lock of note {note_id} poisoned")))?;
            f()
        };
        self.release(note_id, &entry)?;
        result
    }

    /// Number of notes with a live lock entry.
    pub fn active_entries(&self) -> usize {
        self.inner.lock().map(|map| map.len()).unwrap_or(0)
    }

    fn entry(&self, note_id: NoteId) -> ServiceResult<Arc<Mutex<()>>> {
        let mut map = self
            .inner
            .lock()
            .map_err(|_| ServiceError::Internal("note lock registry poisoned".to_string()))?;
        Ok(Arc::clone(map.entry(note_id).or_default()))
    }

    fn release(&self, note_id: NoteId, entry: &Arc<Mutex<()>>) -> ServiceResult<()> {
        let mut map = self
            .inner
            .lock()
            .map_err(|_| ServiceError::Internal("note lock registry poisoned".to_string()))?;
        // Two owners left: the map and `entry`.
        if Arc::strong_count(entry) == 2 {
            map.remove(&note_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::NoteLocks;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use uuid::Uuid;

    #[test]
    fn same_note_sections_never_overlap() {
        let locks = NoteLocks::new();
        let note_id = Uuid::new_v4();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = locks.clone();
                let inside = Arc::clone(&inside);
                let max_seen = Arc::clone(&max_seen);
                thread::spawn(move || {
                    locks
                        .with_note(note_id, || {
                            let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                            max_seen.fetch_max(now, Ordering::SeqCst);
                            thread::yield_now();
                            inside.fetch_sub(1, Ordering::SeqCst);
                            Ok(())
                        })
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(locks.active_entries(), 0);
    }

    #[test]
    fn result_of_closure_is_returned() {
        let locks = NoteLocks::new();
        let value = locks.with_note(Uuid::new_v4(), || Ok(42)).unwrap();
        assert_eq!(value, 42);
    }
}
