//! Persistent storage for projects, roles, status overrides and transition
//! permissions using redb.
//!
//! # Table design
//!
//! Overrides and transitions have no payload; the row *is* the key. Keys are
//! fixed-width big-endian composites so that all rows for one project (or
//! one tracker) form a single contiguous range:
//! ```text
//! status_overrides: [ project: u64 | status: u64 ]                       16 bytes
//! transitions:      [ tracker: u64 | role: u64 | from: u64 | to: u64 ]   32 bytes
//! ```
//! Projects and roles are keyed by their numeric id with a JSON value.

use std::collections::{BTreeSet, HashSet};
use std::fmt::Display;
use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition, WriteTransaction};

use crate::error::{Result, SyncError};
use crate::paths;
use crate::store::ApplyBatch;
use crate::types::{Project, ProjectId, Role, RoleId, StatusId, TrackerId, Transition, WriteOp};

// ---------------------------------------------------------------------------
// Table definitions
// ---------------------------------------------------------------------------

const PROJECTS: TableDefinition<u64, &[u8]> = TableDefinition::new("projects");
const ROLES: TableDefinition<u64, &[u8]> = TableDefinition::new("roles");
const STATUS_OVERRIDES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("status_overrides");
const TRANSITIONS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("transitions");

const EMPTY: &[u8] = &[];

// ---------------------------------------------------------------------------
// Key helpers
// ---------------------------------------------------------------------------

fn override_key(project: ProjectId, status: StatusId) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&project.0.to_be_bytes());
    key[8..].copy_from_slice(&status.0.to_be_bytes());
    key
}

fn transition_key(t: &Transition) -> [u8; 32] {
    let mut key = [0u8; 32];
    key[..8].copy_from_slice(&t.tracker.0.to_be_bytes());
    key[8..16].copy_from_slice(&t.role.0.to_be_bytes());
    key[16..24].copy_from_slice(&t.from.0.to_be_bytes());
    key[24..].copy_from_slice(&t.to.0.to_be_bytes());
    key
}

fn u64_at(bytes: &[u8], offset: usize) -> Option<u64> {
    let chunk: [u8; 8] = bytes.get(offset..offset + 8)?.try_into().ok()?;
    Some(u64::from_be_bytes(chunk))
}

/// Decodes a stored key as-is, including any self-transition written by
/// another tool, so the reconciler can see and remove it.
fn decode_transition(key: &[u8]) -> Option<Transition> {
    if key.len() != 32 {
        return None;
    }
    Some(Transition {
        tracker: TrackerId(u64_at(key, 0)?),
        role: RoleId(u64_at(key, 8)?),
        from: StatusId(u64_at(key, 16)?),
        to: StatusId(u64_at(key, 24)?),
    })
}

/// Inclusive key bounds covering every row whose first 8 bytes are `prefix`.
fn prefix_bounds<const N: usize>(prefix: u64) -> ([u8; N], [u8; N]) {
    let mut lo = [0u8; N];
    let mut hi = [0xffu8; N];
    lo[..8].copy_from_slice(&prefix.to_be_bytes());
    hi[..8].copy_from_slice(&prefix.to_be_bytes());
    (lo, hi)
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn db_err(e: impl Display) -> SyncError {
    SyncError::Database(e.to_string())
}

fn read_err(e: impl Display) -> SyncError {
    SyncError::ReadFailure(e.to_string())
}

fn write_err(op: WriteOp, transition: &Transition) -> impl Fn(redb::Error) -> SyncError + '_ {
    move |e| SyncError::WriteFailure {
        op,
        transition: *transition,
        reason: e.to_string(),
    }
}

// ---------------------------------------------------------------------------
// WorkflowDb
// ---------------------------------------------------------------------------

/// Persistent store for the workflow relations a tracker is reconciled from.
pub struct WorkflowDb {
    db: Database,
}

impl WorkflowDb {
    /// Open or create the redb database at `path`, creating all tables.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            crate::io::ensure_dir(parent)?;
        }
        let db = Database::create(path).map_err(db_err)?;
        let wt = db.begin_write().map_err(db_err)?;
        wt.open_table(PROJECTS).map_err(db_err)?;
        wt.open_table(ROLES).map_err(db_err)?;
        wt.open_table(STATUS_OVERRIDES).map_err(db_err)?;
        wt.open_table(TRANSITIONS).map_err(db_err)?;
        wt.commit().map_err(db_err)?;
        Ok(Self { db })
    }

    // -----------------------------------------------------------------------
    // Projects
    // -----------------------------------------------------------------------

    pub fn add_project(&self, identifier: &str, name: Option<String>) -> Result<Project> {
        paths::validate_identifier(identifier)?;
        let wt = self.db.begin_write().map_err(db_err)?;
        let project = {
            let mut table = wt.open_table(PROJECTS).map_err(db_err)?;
            for entry in table.iter().map_err(db_err)? {
                let (_, v) = entry.map_err(db_err)?;
                let existing: Project = serde_json::from_slice(v.value())?;
                if existing.identifier == identifier {
                    return Err(SyncError::ProjectExists(identifier.to_string()));
                }
            }
            let next = table
                .last()
                .map_err(db_err)?
                .map(|(k, _)| k.value() + 1)
                .unwrap_or(1);
            let project = Project {
                id: ProjectId(next),
                identifier: identifier.to_string(),
                name,
            };
            let value = serde_json::to_vec(&project)?;
            table.insert(next, value.as_slice()).map_err(db_err)?;
            project
        };
        wt.commit().map_err(db_err)?;
        Ok(project)
    }

    /// All projects in id order.
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let rt = self.db.begin_read().map_err(read_err)?;
        let table = rt.open_table(PROJECTS).map_err(read_err)?;
        let mut result = Vec::new();
        for entry in table.iter().map_err(read_err)? {
            let (_, v) = entry.map_err(read_err)?;
            result.push(serde_json::from_slice(v.value()).map_err(read_err)?);
        }
        Ok(result)
    }

    pub fn find_project(&self, identifier: &str) -> Result<Option<Project>> {
        Ok(self
            .list_projects()?
            .into_iter()
            .find(|p| p.identifier == identifier))
    }

    pub fn project_exists(&self, project: ProjectId) -> Result<bool> {
        let rt = self.db.begin_read().map_err(read_err)?;
        let table = rt.open_table(PROJECTS).map_err(read_err)?;
        let found = table.get(project.0).map_err(read_err)?.is_some();
        Ok(found)
    }

    // -----------------------------------------------------------------------
    // Roles
    // -----------------------------------------------------------------------

    pub fn add_role(&self, name: &str, builtin: bool) -> Result<Role> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SyncError::InvalidInput("role name must not be empty".into()));
        }
        let wt = self.db.begin_write().map_err(db_err)?;
        let role = {
            let mut table = wt.open_table(ROLES).map_err(db_err)?;
            let next = table
                .last()
                .map_err(db_err)?
                .map(|(k, _)| k.value() + 1)
                .unwrap_or(1);
            let role = Role {
                id: RoleId(next),
                name: name.to_string(),
                builtin,
            };
            let value = serde_json::to_vec(&role)?;
            table.insert(next, value.as_slice()).map_err(db_err)?;
            role
        };
        wt.commit().map_err(db_err)?;
        Ok(role)
    }

    pub fn list_roles(&self) -> Result<Vec<Role>> {
        let rt = self.db.begin_read().map_err(read_err)?;
        let table = rt.open_table(ROLES).map_err(read_err)?;
        let mut result = Vec::new();
        for entry in table.iter().map_err(read_err)? {
            let (_, v) = entry.map_err(read_err)?;
            result.push(serde_json::from_slice(v.value()).map_err(read_err)?);
        }
        Ok(result)
    }

    pub fn eligible_roles(&self) -> Result<BTreeSet<RoleId>> {
        Ok(self
            .list_roles()?
            .into_iter()
            .filter(|r| !r.builtin)
            .map(|r| r.id)
            .collect())
    }

    // -----------------------------------------------------------------------
    // Status overrides
    // -----------------------------------------------------------------------

    pub fn status_overrides_for(&self, project: ProjectId) -> Result<BTreeSet<StatusId>> {
        let (lo, hi) = prefix_bounds::<16>(project.0);
        let rt = self.db.begin_read().map_err(read_err)?;
        let table = rt.open_table(STATUS_OVERRIDES).map_err(read_err)?;
        let mut result = BTreeSet::new();
        for entry in table.range(lo.as_slice()..=hi.as_slice()).map_err(read_err)? {
            let (k, _) = entry.map_err(read_err)?;
            let status = u64_at(k.value(), 8)
                .ok_or_else(|| SyncError::ReadFailure("malformed status override key".into()))?;
            result.insert(StatusId(status));
        }
        Ok(result)
    }

    /// Replace every override of `project` with `statuses` in one transaction.
    ///
    /// An empty `statuses` leaves the project on the global defaults.
    pub fn replace_status_overrides(
        &self,
        project: ProjectId,
        statuses: &BTreeSet<StatusId>,
    ) -> Result<()> {
        let (lo, hi) = prefix_bounds::<16>(project.0);
        let wt = self.db.begin_write().map_err(db_err)?;
        {
            let projects = wt.open_table(PROJECTS).map_err(db_err)?;
            if projects.get(project.0).map_err(db_err)?.is_none() {
                return Err(SyncError::InvalidInput(format!("unknown project {project}")));
            }

            let mut table = wt.open_table(STATUS_OVERRIDES).map_err(db_err)?;
            let mut stale: Vec<Vec<u8>> = Vec::new();
            for entry in table.range(lo.as_slice()..=hi.as_slice()).map_err(db_err)? {
                let (k, _) = entry.map_err(db_err)?;
                stale.push(k.value().to_vec());
            }
            for key in &stale {
                table.remove(key.as_slice()).map_err(db_err)?;
            }
            for status in statuses {
                let key = override_key(project, *status);
                table.insert(key.as_slice(), EMPTY).map_err(db_err)?;
            }
        }
        wt.commit().map_err(db_err)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    pub fn persisted_transitions(&self, tracker: TrackerId) -> Result<HashSet<Transition>> {
        let (lo, hi) = prefix_bounds::<32>(tracker.0);
        let rt = self.db.begin_read().map_err(read_err)?;
        let table = rt.open_table(TRANSITIONS).map_err(read_err)?;
        let mut result = HashSet::new();
        for entry in table.range(lo.as_slice()..=hi.as_slice()).map_err(read_err)? {
            let (k, _) = entry.map_err(read_err)?;
            let t = decode_transition(k.value())
                .ok_or_else(|| SyncError::ReadFailure("malformed transition key".into()))?;
            result.insert(t);
        }
        Ok(result)
    }

    /// Starts a write transaction scoped to one apply phase.
    pub fn begin_apply(&self) -> Result<RedbBatch> {
        let wt = self.db.begin_write().map_err(db_err)?;
        Ok(RedbBatch { wt })
    }
}

// ---------------------------------------------------------------------------
// RedbBatch
// ---------------------------------------------------------------------------

/// Transition writes inside a single redb write transaction.
///
/// redb admits one writer at a time, and the existence check in
/// `insert_transition` runs inside that transaction, so concurrent
/// reconciliations of the same tracker cannot insert a tuple twice.
pub struct RedbBatch {
    wt: WriteTransaction,
}

impl ApplyBatch for RedbBatch {
    fn is_transactional(&self) -> bool {
        true
    }

    fn insert_transition(&mut self, transition: &Transition) -> Result<()> {
        let fail = write_err(WriteOp::Insert, transition);
        let key = transition_key(transition);
        let mut table = self
            .wt
            .open_table(TRANSITIONS)
            .map_err(|e| fail(e.into()))?;
        if table
            .get(key.as_slice())
            .map_err(|e| fail(e.into()))?
            .is_some()
        {
            return Err(SyncError::Conflict(*transition));
        }
        table
            .insert(key.as_slice(), EMPTY)
            .map_err(|e| fail(e.into()))?;
        Ok(())
    }

    fn delete_transition(&mut self, transition: &Transition) -> Result<()> {
        let fail = write_err(WriteOp::Delete, transition);
        let key = transition_key(transition);
        let mut table = self
            .wt
            .open_table(TRANSITIONS)
            .map_err(|e| fail(e.into()))?;
        table.remove(key.as_slice()).map_err(|e| fail(e.into()))?;
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<()> {
        self.wt.commit().map_err(db_err)
    }

    fn rollback(self: Box<Self>) -> Result<()> {
        self.wt.abort().map_err(db_err)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
