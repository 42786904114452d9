//! In-memory `WorkflowStore`, non-transactional.
//!
//! Used by embedders that keep workflow state elsewhere and by tests, which
//! can inject read and write failures.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Mutex, MutexGuard};

use crate::error::{Result, SyncError};
use crate::store::{ApplyBatch, WorkflowStore};
use crate::types::{ProjectId, Role, RoleId, StatusId, TrackerId, Transition, WriteOp};

#[derive(Debug, Default)]
struct Inner {
    projects: Vec<ProjectId>,
    overrides: BTreeMap<ProjectId, BTreeSet<StatusId>>,
    defaults: BTreeSet<StatusId>,
    roles: Vec<Role>,
    transitions: HashSet<Transition>,
    fail_reads: bool,
    fail_write_on: Option<(WriteOp, Transition)>,
}

#[derive(Debug)]
pub struct MemoryStore {
    tracker: TrackerId,
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new(tracker: TrackerId) -> Self {
        Self {
            tracker,
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_project(&self, project: ProjectId) {
        let mut inner = self.lock();
        if !inner.projects.contains(&project) {
            inner.projects.push(project);
        }
    }

    /// Replace a project's overrides; an empty set reverts it to the defaults.
    pub fn set_overrides(&self, project: ProjectId, statuses: impl IntoIterator<Item = StatusId>) {
        let set: BTreeSet<StatusId> = statuses.into_iter().collect();
        let mut inner = self.lock();
        if set.is_empty() {
            inner.overrides.remove(&project);
        } else {
            inner.overrides.insert(project, set);
        }
    }

    pub fn set_defaults(&self, statuses: impl IntoIterator<Item = StatusId>) {
        self.lock().defaults = statuses.into_iter().collect();
    }

    pub fn add_role(&self, role: Role) {
        self.lock().roles.push(role);
    }

    /// Seed a persisted tuple directly, bypassing conflict checks.
    pub fn seed_transition(&self, transition: Transition) {
        self.lock().transitions.insert(transition);
    }

    pub fn transitions(&self) -> HashSet<Transition> {
        self.lock().transitions.clone()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    pub fn fail_write_on(&self, op: WriteOp, transition: Transition) {
        self.lock().fail_write_on = Some((op, transition));
    }

    pub fn clear_write_fault(&self) {
        self.lock().fail_write_on = None;
    }

    fn read(&self) -> Result<MutexGuard<'_, Inner>> {
        let inner = self.lock();
        if inner.fail_reads {
            return Err(SyncError::ReadFailure("memory store unavailable".into()));
        }
        Ok(inner)
    }
}

impl WorkflowStore for MemoryStore {
    fn tracker_id(&self) -> TrackerId {
        self.tracker
    }

    fn list_projects(&self) -> Result<Vec<ProjectId>> {
        Ok(self.read()?.projects.clone())
    }

    fn project_exists(&self, project: ProjectId) -> Result<bool> {
        Ok(self.read()?.projects.contains(&project))
    }

    fn status_overrides_for(&self, project: ProjectId) -> Result<BTreeSet<StatusId>> {
        Ok(self
            .read()?
            .overrides
            .get(&project)
            .cloned()
            .unwrap_or_default())
    }

    fn global_default_statuses(&self) -> Result<BTreeSet<StatusId>> {
        Ok(self.read()?.defaults.clone())
    }

    fn eligible_roles(&self) -> Result<BTreeSet<RoleId>> {
        Ok(self
            .read()?
            .roles
            .iter()
            .filter(|r| !r.builtin)
            .map(|r| r.id)
            .collect())
    }

    fn persisted_transitions(&self, tracker: TrackerId) -> Result<HashSet<Transition>> {
        Ok(self
            .read()?
            .transitions
            .iter()
            .filter(|t| t.tracker == tracker)
            .copied()
            .collect())
    }

    fn begin_apply(&self) -> Result<Box<dyn ApplyBatch + '_>> {
        Ok(Box::new(MemoryBatch { store: self }))
    }
}

struct MemoryBatch<'a> {
    store: &'a MemoryStore,
}

impl MemoryBatch<'_> {
    fn check_fault(inner: &Inner, op: WriteOp, transition: &Transition) -> Result<()> {
        if inner.fail_write_on == Some((op, *transition)) {
            return Err(SyncError::WriteFailure {
                op,
                transition: *transition,
                reason: "injected write failure".into(),
            });
        }
        Ok(())
    }
}

impl ApplyBatch for MemoryBatch<'_> {
    fn is_transactional(&self) -> bool {
        false
    }

    fn insert_transition(&mut self, transition: &Transition) -> Result<()> {
        let mut inner = self.store.lock();
        Self::check_fault(&inner, WriteOp::Insert, transition)?;
        if !inner.transitions.insert(*transition) {
            return Err(SyncError::Conflict(*transition));
        }
        Ok(())
    }

    fn delete_transition(&mut self, transition: &Transition) -> Result<()> {
        let mut inner = self.store.lock();
        Self::check_fault(&inner, WriteOp::Delete, transition)?;
        inner.transitions.remove(transition);
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<()> {
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
