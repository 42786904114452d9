//! Persistence seam for the reconciler.
//!
//! `WorkflowStore` covers every read the reconciler performs. Writes go
//! through an `ApplyBatch` obtained from `begin_apply`, so a backend with
//! transactions can scope the whole delete/insert phase in one.

use std::collections::{BTreeSet, HashSet};

use crate::error::Result;
use crate::types::{ProjectId, RoleId, StatusId, TrackerId, Transition};

pub trait WorkflowStore {
    /// The tracker this store is configured to manage.
    fn tracker_id(&self) -> TrackerId;

    /// All known projects, in no particular order.
    fn list_projects(&self) -> Result<Vec<ProjectId>>;

    fn project_exists(&self, project: ProjectId) -> Result<bool>;

    /// A project's explicit status overrides; empty when none are configured.
    fn status_overrides_for(&self, project: ProjectId) -> Result<BTreeSet<StatusId>>;

    fn global_default_statuses(&self) -> Result<BTreeSet<StatusId>>;

    /// Roles eligible for transitions, with built-in roles already removed.
    fn eligible_roles(&self) -> Result<BTreeSet<RoleId>>;

    fn persisted_transitions(&self, tracker: TrackerId) -> Result<HashSet<Transition>>;

    fn begin_apply(&self) -> Result<Box<dyn ApplyBatch + '_>>;
}

/// A sequence of transition writes.
///
/// Transactional batches publish nothing until `commit`; non-transactional
/// batches make each write durable as it returns.
pub trait ApplyBatch {
    fn is_transactional(&self) -> bool;

    /// Fails with `SyncError::Conflict` when the tuple already exists.
    fn insert_transition(&mut self, transition: &Transition) -> Result<()>;

    /// Deleting an absent tuple is not an error.
    fn delete_transition(&mut self, transition: &Transition) -> Result<()>;

    fn commit(self: Box<Self>) -> Result<()>;

    fn rollback(self: Box<Self>) -> Result<()>;
}
