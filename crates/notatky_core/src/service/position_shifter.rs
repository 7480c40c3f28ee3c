//! Slot opening and closing over one note's children.
//!
//! # Responsibility
//! - Open a slot (`insert_at`) by moving every child at or after it up by one.
//! - Close a slot (`remove_at`) by moving every child after it down by one.
//!
//! # Invariants
//! - Relative order of the moved children is preserved.
//! - Writes are ordered so that each target slot is already free when it is
//!   written: descending for inserts, ascending for removals.
//! - Callers run these inside the note's transaction; a partial shift is
//!   never committed.
//! - No write ever lands above `MAX_POSITION`; an insert that would push a
//!   child past it is rejected before anything moves.

use crate::model::child::{ChildId, ChildRecord, MAX_POSITION};
use crate::model::note::NoteId;
use crate::repo::child_index::SqliteChildIndex;
use crate::repo::{RepoError, RepoResult};
use crate::service::error::{ServiceError, ServiceResult};

/// One planned position change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shift {
    pub child_id: ChildId,
    pub from: u32,
    pub to: u32,
}

/// Plans the moves that free `position`.
///
/// Returns no moves when nothing occupies `position`.
pub fn plan_insert(children: &[ChildRecord], position: u32) -> Vec<Shift> {
    if !children.iter().any(|child| child.position == position) {
        return Vec::new();
    }

    let mut shifts: Vec<Shift> = children
        .iter()
        .filter(|child| child.position >= position)
        .map(|child| Shift {
            child_id: child.id,
            from: child.position,
            to: child.position.saturating_add(1),
        })
        .collect();
    shifts.sort_by(|a, b| b.from.cmp(&a.from));
    shifts
}

/// Plans the moves that close the slot left at `position`.
pub fn plan_remove(children: &[ChildRecord], position: u32) -> Vec<Shift> {
    let mut shifts: Vec<Shift> = children
        .iter()
        .filter(|child| child.position > position)
        .map(|child| Shift {
            child_id: child.id,
            from: child.position,
            to: child.position - 1,
        })
        .collect();
    shifts.sort_by_key(|shift| shift.from);
    shifts
}

/// Opens `position` in the note if it is occupied. Returns the number of
/// children moved.
///
/// Fails with `InvalidEntry` when `position` or any shifted child would end
/// up above `MAX_POSITION`.
pub fn insert_at(
    index: &SqliteChildIndex<'_>,
    note_id: NoteId,
    position: u32,
) -> ServiceResult<usize> {
    check_ceiling(note_id, position)?;
    let tail = index.list_from_position(note_id, position)?;
    let shifts = plan_insert(&tail, position);
    // Highest target first.
    if let Some(top) = shifts.first() {
        check_ceiling(note_id, top.to)?;
    }
    Ok(apply(index, &shifts)?)
}

/// Closes the gap at `position` after the child there was removed. Returns
/// the number of children moved.
pub fn remove_at(
    index: &SqliteChildIndex<'_>,
    note_id: NoteId,
    position: u32,
) -> ServiceResult<usize> {
    let tail = index.list_from_position(note_id, position)?;
    Ok(apply(index, &plan_remove(&tail, position))?)
}

fn check_ceiling(note_id: NoteId, position: u32) -> ServiceResult<()> {
    if position > MAX_POSITION {
        return Err(ServiceError::InvalidEntry(format!(
            "note {note_id} has no free position at or below {MAX_POSITION}"
        )));
    }
    Ok(())
}

fn apply(index: &SqliteChildIndex<'_>, shifts: &[Shift]) -> RepoResult<usize> {
    for shift in shifts {
        if !index.set_position(shift.child_id, shift.to)? {
            return Err(RepoError::InvalidData(format!(
                "child {} vanished while shifting from {} to {}",
                shift.child_id, shift.from, shift.to
            )));
        }
    }
    Ok(shifts.len())
}
