//! Converges the persisted transition permissions of a tracker to exactly
//! the set required by the current status universe and eligible roles.
//!
//! The read phase (`plan`) performs no writes. The apply phase deletes
//! before it inserts, so an interrupted run leaves the tracker with fewer
//! permissions rather than stale ones. Every run is idempotent; a later run
//! repairs whatever an interrupted or racing run left behind.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::diff::{diff, EdgeDiff};
use crate::error::{FailedWrite, PartialApply, Result, SyncError};
use crate::permute::generate;
use crate::store::{ApplyBatch, WorkflowStore};
use crate::types::{RoleId, StatusId, TrackerId, Transition, WriteOp};
use crate::universe::universe_of;

// ---------------------------------------------------------------------------
// Plan / report types
// ---------------------------------------------------------------------------

/// Outcome of the read phase.
#[derive(Debug, Clone)]
pub struct SyncPlan {
    pub tracker: TrackerId,
    pub universe: BTreeSet<StatusId>,
    pub roles: BTreeSet<RoleId>,
    pub required: HashSet<Transition>,
    pub diff: EdgeDiff,
}

impl SyncPlan {
    pub fn is_converged(&self) -> bool {
        self.diff.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub tracker: TrackerId,
    pub universe_size: usize,
    pub role_count: usize,
    pub required: usize,
    pub inserted: usize,
    pub deleted: usize,
    /// Inserts skipped because the tuple was already present.
    pub conflicts: usize,
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Progress {
    deleted: usize,
    inserted: usize,
    conflicts: usize,
}

// ---------------------------------------------------------------------------
// plan
// ---------------------------------------------------------------------------

/// Computes the required set for `tracker` and diffs it against the store.
pub fn plan<S: WorkflowStore + ?Sized>(store: &S, tracker: TrackerId) -> Result<SyncPlan> {
    if tracker.0 == 0 {
        return Err(SyncError::InvalidInput("tracker id must be non-zero".into()));
    }

    let projects = store.list_projects()?;
    let universe = universe_of(store, &projects)?;
    let roles = store.eligible_roles()?;
    let required = generate(&universe, &roles, tracker);
    let persisted = store.persisted_transitions(tracker)?;
    let diff = diff(&required, &persisted);

    debug!(
        tracker = %tracker,
        projects = projects.len(),
        statuses = universe.len(),
        roles = roles.len(),
        required = required.len(),
        persisted = persisted.len(),
        to_insert = diff.to_insert.len(),
        to_delete = diff.to_delete.len(),
        "computed transition plan"
    );

    Ok(SyncPlan {
        tracker,
        universe,
        roles,
        required,
        diff,
    })
}

// ---------------------------------------------------------------------------
// synchronize
// ---------------------------------------------------------------------------

/// Deletes stale and inserts missing transitions for `tracker`.
///
/// Read failures abort before any write. A failed write stops the run and
/// returns `SyncError::Incomplete` with the applied counts and the failing
/// tuple; transactional stores are rolled back first. Inserts that hit an
/// existing tuple are logged and counted as conflicts, not errors.
pub fn synchronize<S: WorkflowStore + ?Sized>(store: &S, tracker: TrackerId) -> Result<SyncReport> {
    let plan = plan(store, tracker)?;
    let deletes = plan.diff.sorted_deletes();
    let inserts = plan.diff.sorted_inserts();

    let mut report = SyncReport {
        tracker,
        universe_size: plan.universe.len(),
        role_count: plan.roles.len(),
        required: plan.required.len(),
        inserted: 0,
        deleted: 0,
        conflicts: 0,
        synced_at: Utc::now(),
    };

    if plan.is_converged() {
        debug!(tracker = %tracker, "transitions already converged");
        return Ok(report);
    }

    let mut batch = store.begin_apply()?;
    let transactional = batch.is_transactional();
    let mut progress = Progress::default();

    if let Err((failed, err)) = apply(batch.as_mut(), &deletes, &inserts, &mut progress) {
        warn!(op = %failed.op, transition = %failed.transition, error = %err, "transition write failed");
        if transactional {
            if let Err(e) = batch.rollback() {
                warn!(error = %e, "rollback failed");
            }
        }
        return Err(incomplete(
            &progress,
            deletes.len(),
            inserts.len(),
            Some(failed),
            err.to_string(),
            transactional,
        ));
    }

    if let Err(err) = batch.commit() {
        warn!(tracker = %tracker, error = %err, "transition commit failed");
        return Err(incomplete(
            &progress,
            deletes.len(),
            inserts.len(),
            None,
            err.to_string(),
            transactional,
        ));
    }

    report.deleted = progress.deleted;
    report.inserted = progress.inserted;
    report.conflicts = progress.conflicts;
    info!(
        tracker = %tracker,
        deleted = report.deleted,
        inserted = report.inserted,
        conflicts = report.conflicts,
        "transitions synchronized"
    );
    Ok(report)
}

fn apply<B: ApplyBatch + ?Sized>(
    batch: &mut B,
    deletes: &[Transition],
    inserts: &[Transition],
    progress: &mut Progress,
) -> std::result::Result<(), (FailedWrite, SyncError)> {
    for t in deletes {
        batch.delete_transition(t).map_err(|e| {
            (
                FailedWrite {
                    op: WriteOp::Delete,
                    transition: *t,
                },
                e,
            )
        })?;
        progress.deleted += 1;
    }
    for t in inserts {
        match batch.insert_transition(t) {
            Ok(()) => progress.inserted += 1,
            Err(SyncError::Conflict(existing)) => {
                warn!(transition = %existing, "transition already present, skipping insert");
                progress.conflicts += 1;
            }
            Err(e) => {
                return Err((
                    FailedWrite {
                        op: WriteOp::Insert,
                        transition: *t,
                    },
                    e,
                ))
            }
        }
    }
    Ok(())
}

/// When the batch was transactional nothing became durable, so only the
/// benign conflicts survive in the accounting.
fn incomplete(
    progress: &Progress,
    total_deletes: usize,
    total_inserts: usize,
    failed: Option<FailedWrite>,
    reason: String,
    rolled_back: bool,
) -> SyncError {
    let (deleted, inserted) = if rolled_back {
        (0, 0)
    } else {
        (progress.deleted, progress.inserted)
    };
    SyncError::Incomplete(Box::new(PartialApply {
        deleted,
        inserted,
        conflicts: progress.conflicts,
        remaining_deletes: total_deletes - deleted,
        remaining_inserts: total_inserts - inserted - progress.conflicts,
        failed,
        reason,
        rolled_back,
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::types::{ProjectId, Role};

    const T: TrackerId = TrackerId(7);
    const A: StatusId = StatusId(1);
    const B: StatusId = StatusId(2);
    const C: StatusId = StatusId(3);
    const R1: RoleId = RoleId(1);

    fn tr(role: RoleId, from: StatusId, to: StatusId) -> Transition {
        Transition::new(T, role, from, to).unwrap()
    }

    fn set(v: &[Transition]) -> HashSet<Transition> {
        v.iter().copied().collect()
    }

    fn role(id: RoleId, builtin: bool) -> Role {
        Role {
            id,
            name: format!("role-{id}"),
            builtin,
        }
    }

    /// Universe {A, B}, one eligible role R1, one project on defaults.
    fn store_ab() -> MemoryStore {
        let store = MemoryStore::new(T);
        store.set_defaults([A, B]);
        store.add_role(role(R1, false));
        store.add_role(role(RoleId(99), true));
        store.add_project(ProjectId(1));
        store
    }

    #[test]
    fn empty_store_inserts_both_directions() {
        let store = store_ab();
        let report = synchronize(&store, T).unwrap();
        assert_eq!(report.inserted, 2);
        assert_eq!(report.deleted, 0);
        assert_eq!(store.transitions(), set(&[tr(R1, A, B), tr(R1, B, A)]));
    }

    #[test]
    fn second_run_is_a_noop() {
        let store = store_ab();
        synchronize(&store, T).unwrap();
        let again = synchronize(&store, T).unwrap();
        assert_eq!(again.inserted, 0);
        assert_eq!(again.deleted, 0);
        assert_eq!(again.conflicts, 0);
    }

    #[test]
    fn after_sync_persisted_equals_required() {
        let store = store_ab();
        store.set_defaults([A, B, C]);
        store.add_role(role(RoleId(2), false));
        synchronize(&store, T).unwrap();
        let required = plan(&store, T).unwrap().required;
        assert_eq!(store.persisted_transitions(T).unwrap(), required);
        assert_eq!(required.len(), 3 * 2 * 2);
    }

    #[test]
    fn dropping_a_status_deletes_its_transitions() {
        let store = store_ab();
        synchronize(&store, T).unwrap();

        // The only project now overrides to {A}; defaults shrink to {A}.
        store.set_defaults([A]);
        store.set_overrides(ProjectId(1), [A]);
        let report = synchronize(&store, T).unwrap();
        assert_eq!(report.deleted, 2);
        assert_eq!(report.inserted, 0);
        assert!(store.transitions().is_empty());
    }

    #[test]
    fn stale_tuple_outside_universe_is_removed() {
        let store = store_ab();
        store.seed_transition(tr(R1, A, B));
        store.seed_transition(tr(R1, B, A));
        store.seed_transition(tr(R1, A, C));
        let report = synchronize(&store, T).unwrap();
        assert_eq!(report.deleted, 1);
        assert_eq!(report.inserted, 0);
        assert_eq!(store.transitions(), set(&[tr(R1, A, B), tr(R1, B, A)]));
    }

    #[test]
    fn persisted_self_transition_is_removed() {
        let store = store_ab();
        store.seed_transition(Transition {
            tracker: T,
            role: R1,
            from: A,
            to: A,
        });
        synchronize(&store, T).unwrap();
        assert!(store.transitions().iter().all(|t| t.from != t.to));
    }

    #[test]
    fn other_trackers_are_untouched() {
        let store = store_ab();
        let foreign = Transition::new(TrackerId(8), R1, A, C).unwrap();
        store.seed_transition(foreign);
        synchronize(&store, T).unwrap();
        assert!(store.transitions().contains(&foreign));
    }

    #[test]
    fn new_override_grows_without_deleting() {
        let store = store_ab();
        synchronize(&store, T).unwrap();
        let before = store.transitions();

        store.add_project(ProjectId(2));
        store.set_overrides(ProjectId(2), [B, C]);
        let report = synchronize(&store, T).unwrap();
        assert_eq!(report.deleted, 0);
        assert!(before.is_subset(&store.transitions()));
        assert_eq!(store.transitions().len(), 3 * 2);
    }

    #[test]
    fn project_order_does_not_change_required_set() {
        let forward = store_ab();
        let backward = MemoryStore::new(T);
        backward.set_defaults([A, B]);
        backward.add_role(role(R1, false));
        for p in [3, 2, 1] {
            backward.add_project(ProjectId(p));
        }
        for p in [1, 2, 3] {
            forward.add_project(ProjectId(p));
        }
        for s in [&forward, &backward] {
            s.set_overrides(ProjectId(2), [C]);
            s.set_overrides(ProjectId(3), [A, StatusId(4)]);
        }
        assert_eq!(
            plan(&forward, T).unwrap().required,
            plan(&backward, T).unwrap().required
        );
    }

    #[test]
    fn zero_tracker_is_invalid_input() {
        let store = store_ab();
        assert!(matches!(
            synchronize(&store, TrackerId(0)),
            Err(SyncError::InvalidInput(_))
        ));
        assert!(store.transitions().is_empty());
    }

    #[test]
    fn read_failure_aborts_without_mutation() {
        let store = store_ab();
        store.seed_transition(tr(R1, A, C));
        store.fail_reads(true);
        assert!(matches!(
            synchronize(&store, T),
            Err(SyncError::ReadFailure(_))
        ));
        store.fail_reads(false);
        assert_eq!(store.transitions(), set(&[tr(R1, A, C)]));
    }

    #[test]
    fn insert_failure_reports_progress() {
        let store = store_ab();
        store.seed_transition(tr(R1, A, C));
        // Inserts run in sorted order: (A,B) then (B,A).
        store.fail_write_on(WriteOp::Insert, tr(R1, B, A));

        let err = synchronize(&store, T).unwrap_err();
        let SyncError::Incomplete(p) = err else {
            panic!("expected Incomplete, got {err:?}");
        };
        assert_eq!(p.deleted, 1);
        assert_eq!(p.inserted, 1);
        assert_eq!(p.remaining_deletes, 0);
        assert_eq!(p.remaining_inserts, 1);
        assert!(!p.rolled_back);
        assert_eq!(
            p.failed,
            Some(FailedWrite {
                op: WriteOp::Insert,
                transition: tr(R1, B, A)
            })
        );
        // Deletes ran first: the stale tuple is gone, one insert landed.
        assert_eq!(store.transitions(), set(&[tr(R1, A, B)]));
    }

    #[test]
    fn delete_failure_stops_before_inserts() {
        let store = store_ab();
        store.seed_transition(tr(R1, A, C));
        store.fail_write_on(WriteOp::Delete, tr(R1, A, C));

        let err = synchronize(&store, T).unwrap_err();
        let SyncError::Incomplete(p) = err else {
            panic!("expected Incomplete, got {err:?}");
        };
        assert_eq!(p.deleted, 0);
        assert_eq!(p.inserted, 0);
        assert_eq!(p.remaining_deletes, 1);
        assert_eq!(p.remaining_inserts, 2);
        assert_eq!(store.transitions(), set(&[tr(R1, A, C)]));
    }

    #[test]
    fn retry_after_failure_converges() {
        let store = store_ab();
        store.fail_write_on(WriteOp::Insert, tr(R1, B, A));
        assert!(synchronize(&store, T).is_err());

        store.clear_write_fault();
        let report = synchronize(&store, T).unwrap();
        assert_eq!(report.inserted, 1);
        assert_eq!(store.transitions(), set(&[tr(R1, A, B), tr(R1, B, A)]));
    }

    // -----------------------------------------------------------------------
    // Transactional store
    // -----------------------------------------------------------------------

    /// Buffers writes and applies them to a `MemoryStore` on commit.
    struct TxStore {
        inner: MemoryStore,
        fail_on: Option<Transition>,
        present: HashSet<Transition>,
    }

    struct TxBatch<'a> {
        store: &'a TxStore,
        ops: Vec<(WriteOp, Transition)>,
    }

    impl WorkflowStore for TxStore {
        fn tracker_id(&self) -> TrackerId {
            self.inner.tracker_id()
        }
        fn list_projects(&self) -> Result<Vec<ProjectId>> {
            self.inner.list_projects()
        }
        fn project_exists(&self, project: ProjectId) -> Result<bool> {
            self.inner.project_exists(project)
        }
        fn status_overrides_for(&self, project: ProjectId) -> Result<BTreeSet<StatusId>> {
            self.inner.status_overrides_for(project)
        }
        fn global_default_statuses(&self) -> Result<BTreeSet<StatusId>> {
            self.inner.global_default_statuses()
        }
        fn eligible_roles(&self) -> Result<BTreeSet<RoleId>> {
            self.inner.eligible_roles()
        }
        fn persisted_transitions(&self, tracker: TrackerId) -> Result<HashSet<Transition>> {
            self.inner.persisted_transitions(tracker)
        }
        fn begin_apply(&self) -> Result<Box<dyn ApplyBatch + '_>> {
            Ok(Box::new(TxBatch {
                store: self,
                ops: Vec::new(),
            }))
        }
    }

    impl ApplyBatch for TxBatch<'_> {
        fn is_transactional(&self) -> bool {
            true
        }
        fn insert_transition(&mut self, t: &Transition) -> Result<()> {
            if self.store.present.contains(t) {
                return Err(SyncError::Conflict(*t));
            }
            if self.store.fail_on == Some(*t) {
                return Err(SyncError::WriteFailure {
                    op: WriteOp::Insert,
                    transition: *t,
                    reason: "disk full".into(),
                });
            }
            self.ops.push((WriteOp::Insert, *t));
            Ok(())
        }
        fn delete_transition(&mut self, t: &Transition) -> Result<()> {
            self.ops.push((WriteOp::Delete, *t));
            Ok(())
        }
        fn commit(self: Box<Self>) -> Result<()> {
            let mut inner = self.store.inner.begin_apply()?;
            for (op, t) in &self.ops {
                match op {
                    WriteOp::Insert => inner.insert_transition(t)?,
                    WriteOp::Delete => inner.delete_transition(t)?,
                }
            }
            inner.commit()
        }
        fn rollback(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn transactional_failure_rolls_back_everything() {
        let store = TxStore {
            inner: store_ab(),
            fail_on: Some(tr(R1, B, A)),
            present: HashSet::new(),
        };
        store.inner.seed_transition(tr(R1, A, C));

        let err = synchronize(&store, T).unwrap_err();
        let SyncError::Incomplete(p) = err else {
            panic!("expected Incomplete, got {err:?}");
        };
        assert!(p.rolled_back);
        assert_eq!((p.deleted, p.inserted), (0, 0));
        assert_eq!((p.remaining_deletes, p.remaining_inserts), (1, 2));
        assert_eq!(store.inner.transitions(), set(&[tr(R1, A, C)]));
    }

    #[test]
    fn transactional_conflict_is_benign() {
        let store = TxStore {
            inner: store_ab(),
            fail_on: None,
            present: set(&[tr(R1, A, B)]),
        };
        let report = synchronize(&store, T).unwrap();
        assert_eq!(report.inserted, 1);
        assert_eq!(report.conflicts, 1);
        assert_eq!(store.inner.transitions(), set(&[tr(R1, B, A)]));
    }
}
