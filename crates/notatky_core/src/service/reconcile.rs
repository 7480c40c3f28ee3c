//! Batch reconciliation of a note's children against a client-declared list.
//!
//! # Responsibility
//! - Diff the desired list against stored children into create, update and
//!   delete sets.
//! - Apply the diff on the caller's transaction and return the resulting
//!   ordered children.
//!
//! # Invariants
//! - Desired positions must be pairwise distinct; the batch is rejected
//!   before any write otherwise. Gaps are accepted as declared.
//! - A stored child keeps its variant; an update that declares another
//!   variant is rejected.
//! - A stored child not referenced by the batch is deleted together with its
//!   content.
//! - Stored rows are parked at negative positions before declared positions
//!   are written, so swaps never collide.

use crate::model::child::{ChildDescriptor, ChildId, ChildRecord, ChildSpec, MAX_POSITION};
use crate::model::note::NoteId;
use crate::repo::child_index::SqliteChildIndex;
use crate::repo::content_store::ContentStore;
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::note_child_service::describe_children;
use log::debug;
use rusqlite::Connection;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Action planned for one desired item, in list order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// Create a new child from `desired[spec_index]`.
    Create { spec_index: usize },
    /// Update the stored `record` from `desired[spec_index]`.
    Update {
        spec_index: usize,
        record: ChildRecord,
    },
}

/// Full diff between stored and desired children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub actions: Vec<SyncAction>,
    /// Stored children the batch no longer references.
    pub deletes: Vec<ChildRecord>,
}

/// Result of applying a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Resulting children ordered by position.
    pub children: Vec<ChildDescriptor>,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

/// Validates `desired` and diffs it against `current`.
pub fn plan_sync(current: Vec<ChildRecord>, desired: &[ChildSpec]) -> ServiceResult<SyncPlan> {
    validate_desired(desired)?;

    let mut lookup: HashMap<ChildId, ChildRecord> =
        current.into_iter().map(|record| (record.id, record)).collect();

    let mut actions = Vec::with_capacity(desired.len());
    for (spec_index, spec) in desired.iter().enumerate() {
        match spec.id.and_then(|id| lookup.remove(&id)) {
            Some(record) => {
                if record.variant != spec.content.variant() {
                    return Err(ServiceError::InvalidEntry(format!(
                        "child {} is {} and cannot become {}",
                        record.id,
                        record.variant,
                        spec.content.variant()
                    )));
                }
                actions.push(SyncAction::Update { spec_index, record });
            }
            None => actions.push(SyncAction::Create { spec_index }),
        }
    }

    let mut deletes: Vec<ChildRecord> = lookup.into_values().collect();
    deletes.sort_by_key(|record| record.position);

    Ok(SyncPlan { actions, deletes })
}

fn validate_desired(desired: &[ChildSpec]) -> ServiceResult<()> {
    let mut seen = HashSet::with_capacity(desired.len());
    for spec in desired {
        spec.content.validate().map_err(ServiceError::InvalidEntry)?;
        if spec.position > MAX_POSITION {
            return Err(ServiceError::InvalidEntry(format!(
                "position {} exceeds maximum {MAX_POSITION}",
                spec.position
            )));
        }
        if !seen.insert(spec.position) {
            return Err(ServiceError::PositionConflict {
                note_id: Uuid::nil(),
                position: spec.position,
            });
        }
    }
    Ok(())
}

/// Applies batch syncs on one transaction-scoped connection.
pub struct ReconciliationEngine<'a, S: ContentStore> {
    conn: &'a Connection,
    store: &'a S,
}

impl<'a, S: ContentStore> ReconciliationEngine<'a, S> {
    pub fn new(conn: &'a Connection, store: &'a S) -> Self {
        Self { conn, store }
    }

    /// Replaces the note's children with `desired`.
    pub fn reconcile(&self, note_id: NoteId, desired: &[ChildSpec]) -> ServiceResult<SyncOutcome> {
        let index = SqliteChildIndex::attach(self.conn);
        let current = index.list_by_note(note_id)?;
        let plan = plan_sync(current, desired).map_err(|err| match err {
            ServiceError::PositionConflict { position, .. } => {
                ServiceError::PositionConflict { note_id, position }
            }
            other => other,
        })?;

        index.park_note(note_id)?;

        for record in &plan.deletes {
            self.store
                .delete(self.conn, record.variant, record.content_id)?;
            index.delete(record.id)?;
        }

        let mut created = 0;
        let mut updated = 0;
        for action in &plan.actions {
            match action {
                SyncAction::Create { spec_index } => {
                    let spec = &desired[*spec_index];
                    let content_id = self.store.put(self.conn, &spec.content)?;
                    index.insert(&ChildRecord {
                        id: Uuid::new_v4(),
                        note_id,
                        variant: spec.content.variant(),
                        content_id,
                        position: spec.position,
                    })?;
                    created += 1;
                }
                SyncAction::Update { spec_index, record } => {
                    let spec = &desired[*spec_index];
                    let stored = self
                        .store
                        .load(self.conn, record.variant, record.content_id)?
                        .ok_or_else(|| missing_content(record))?;
                    if stored != spec.content {
                        self.store
                            .overwrite(self.conn, record.content_id, &spec.content)?;
                        updated += 1;
                    }
                    index.set_position(record.id, spec.position)?;
                }
            }
        }

        let children = describe_children(self.conn, self.store, note_id)?;
        debug!(
            "event=child_sync_apply module=reconcile status=ok note_id={} desired={} created={} updated={} deleted={}",
            note_id,
            desired.len(),
            created,
            updated,
            plan.deletes.len()
        );

        Ok(SyncOutcome {
            children,
            created,
            updated,
            deleted: plan.deletes.len(),
        })
    }
}

pub(crate) fn missing_content(record: &ChildRecord) -> ServiceError {
    ServiceError::Internal(format!(
        "child {} references missing {} content {}",
        record.id, record.variant, record.content_id
    ))
}

#[cfg(test)]
mod tests {
    use super::{plan_sync, SyncAction};
    use crate::model::child::{ChildContent, ChildRecord, ChildSpec, ChildVariant};
    use crate::service::error::ServiceError;
    use uuid::Uuid;

    fn record(note_id: Uuid, variant: ChildVariant, position: u32) -> ChildRecord {
        ChildRecord {
            id: Uuid::new_v4(),
            note_id,
            variant,
            content_id: Uuid::new_v4(),
            position,
        }
    }

    #[test]
    fn plan_splits_into_create_update_delete() {
        let note_id = Uuid::new_v4();
        let a = record(note_id, ChildVariant::Text, 0);
        let b = record(note_id, ChildVariant::Text, 1);
        let desired = vec![
            ChildSpec::existing(b.id, ChildContent::text("B'"), 0),
            ChildSpec::new(ChildContent::text("new"), 1),
        ];

        let plan = plan_sync(vec![a.clone(), b.clone()], &desired).unwrap();

        assert_eq!(
            plan.actions,
            vec![
                SyncAction::Update {
                    spec_index: 0,
                    record: b
                },
                SyncAction::Create { spec_index: 1 },
            ]
        );
        assert_eq!(plan.deletes, vec![a]);
    }

    #[test]
    fn unknown_id_is_treated_as_create() {
        let desired = vec![ChildSpec::existing(
            Uuid::new_v4(),
            ChildContent::text("x"),
            0,
        )];
        let plan = plan_sync(Vec::new(), &desired).unwrap();
        assert_eq!(plan.actions, vec![SyncAction::Create { spec_index: 0 }]);
    }

    #[test]
    fn repeated_id_creates_on_second_occurrence() {
        let note_id = Uuid::new_v4();
        let a = record(note_id, ChildVariant::Text, 0);
        let desired = vec![
            ChildSpec::existing(a.id, ChildContent::text("one"), 0),
            ChildSpec::existing(a.id, ChildContent::text("two"), 1),
        ];

        let plan = plan_sync(vec![a.clone()], &desired).unwrap();
        assert!(matches!(plan.actions[0], SyncAction::Update { spec_index: 0, .. }));
        assert_eq!(plan.actions[1], SyncAction::Create { spec_index: 1 });
        assert!(plan.deletes.is_empty());
    }

    #[test]
    fn duplicate_positions_are_rejected() {
        let desired = vec![
            ChildSpec::new(ChildContent::text("a"), 2),
            ChildSpec::new(ChildContent::text("b"), 2),
        ];
        let err = plan_sync(Vec::new(), &desired).unwrap_err();
        assert!(matches!(err, ServiceError::PositionConflict { position: 2, .. }));
    }

    #[test]
    fn variant_change_is_rejected() {
        let note_id = Uuid::new_v4();
        let a = record(note_id, ChildVariant::Text, 0);
        let desired = vec![ChildSpec::existing(a.id, ChildContent::image("a.png"), 0)];
        let err = plan_sync(vec![a], &desired).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidEntry(_)));
    }

    #[test]
    fn blank_image_reference_is_rejected() {
        let desired = vec![ChildSpec::new(ChildContent::image(" "), 0)];
        let err = plan_sync(Vec::new(), &desired).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidEntry(_)));
    }

    #[test]
    fn empty_batch_deletes_everything() {
        let note_id = Uuid::new_v4();
        let a = record(note_id, ChildVariant::Image, 0);
        let plan = plan_sync(vec![a.clone()], &[]).unwrap();
        assert!(plan.actions.is_empty());
        assert_eq!(plan.deletes, vec![a]);
    }
}
