//! A tracksync root directory: `.tracksync/config.yaml` plus the workflow
//! database, presented to the reconciler as one `WorkflowStore`.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::Config;
use crate::db::WorkflowDb;
use crate::error::{Result, SyncError};
use crate::paths;
use crate::reconcile::{self, SyncPlan, SyncReport};
use crate::resolver::resolve;
use crate::store::{ApplyBatch, WorkflowStore};
use crate::types::{Project, ProjectId, RoleId, StatusId, TrackerId, Transition};
use crate::universe::universe_of;

pub struct Workspace {
    root: PathBuf,
    config: Config,
    db: WorkflowDb,
}

impl Workspace {
    /// Write a fresh config and create the database.
    ///
    /// Refuses a root that already has a config; the default statuses of an
    /// existing workspace change through `set_default_statuses`.
    pub fn init(root: &Path, tracker: TrackerId, default_statuses: Vec<StatusId>) -> Result<Self> {
        if tracker.0 == 0 {
            return Err(SyncError::InvalidInput("tracker id must be non-zero".into()));
        }
        reject_zero_status(&default_statuses)?;
        if paths::config_path(root).exists() {
            return Err(SyncError::AlreadyInitialized(root.display().to_string()));
        }
        crate::io::ensure_dir(&paths::tracksync_dir(root))?;
        let config = Config::new(tracker, default_statuses);
        config.save(root)?;
        let db = WorkflowDb::open(&paths::db_path(root))?;
        info!(root = %root.display(), tracker = %tracker, "initialized workspace");
        Ok(Self {
            root: root.to_path_buf(),
            config,
            db,
        })
    }

    pub fn open(root: &Path) -> Result<Self> {
        let config = Config::load(root)?;
        let db = WorkflowDb::open(&paths::db_path(root))?;
        Ok(Self {
            root: root.to_path_buf(),
            config,
            db,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn db(&self) -> &WorkflowDb {
        &self.db
    }

    /// Look up a project by identifier; unknown identifiers are invalid input.
    pub fn project(&self, identifier: &str) -> Result<Project> {
        self.db
            .find_project(identifier)?
            .ok_or_else(|| SyncError::InvalidInput(format!("unknown project '{identifier}'")))
    }

    /// Statuses a task board for `identifier` shows.
    pub fn project_statuses(&self, identifier: &str) -> Result<BTreeSet<StatusId>> {
        let project = self.project(identifier)?;
        resolve(self, project.id)
    }

    /// The global status universe across defaults and every project.
    pub fn universe(&self) -> Result<BTreeSet<StatusId>> {
        let projects = self.list_projects()?;
        universe_of(self, &projects)
    }

    /// Replace the status overrides of `identifier` without reconciling.
    ///
    /// An empty `statuses` drops the overrides so the project falls back to
    /// the defaults.
    pub fn replace_project_statuses(
        &self,
        identifier: &str,
        statuses: &BTreeSet<StatusId>,
    ) -> Result<()> {
        reject_zero_status(statuses)?;
        let project = self.project(identifier)?;
        self.db.replace_status_overrides(project.id, statuses)?;
        info!(
            project = %project.identifier,
            statuses = statuses.len(),
            "project status overrides replaced"
        );
        Ok(())
    }

    /// `replace_project_statuses`, then synchronize.
    pub fn set_project_statuses(
        &self,
        identifier: &str,
        statuses: &BTreeSet<StatusId>,
    ) -> Result<SyncReport> {
        self.replace_project_statuses(identifier, statuses)?;
        self.synchronize()
    }

    /// Replace the global default statuses and save the config without
    /// reconciling.
    pub fn replace_default_statuses(&mut self, statuses: &BTreeSet<StatusId>) -> Result<()> {
        reject_zero_status(statuses)?;
        let mut config = self.config.clone();
        config.default_statuses = statuses.iter().copied().collect();
        config.save(&self.root)?;
        self.config = config;
        info!(statuses = statuses.len(), "default task statuses replaced");
        Ok(())
    }

    /// `replace_default_statuses`, then synchronize.
    pub fn set_default_statuses(&mut self, statuses: &BTreeSet<StatusId>) -> Result<SyncReport> {
        self.replace_default_statuses(statuses)?;
        self.synchronize()
    }

    pub fn plan(&self) -> Result<SyncPlan> {
        reconcile::plan(self, self.config.tracker)
    }

    pub fn synchronize(&self) -> Result<SyncReport> {
        reconcile::synchronize(self, self.config.tracker)
    }
}

fn reject_zero_status<'a>(statuses: impl IntoIterator<Item = &'a StatusId>) -> Result<()> {
    if statuses.into_iter().any(|s| s.0 == 0) {
        return Err(SyncError::InvalidInput("status ids must be non-zero".into()));
    }
    Ok(())
}

impl WorkflowStore for Workspace {
    fn tracker_id(&self) -> TrackerId {
        self.config.tracker
    }

    fn list_projects(&self) -> Result<Vec<ProjectId>> {
        Ok(self.db.list_projects()?.into_iter().map(|p| p.id).collect())
    }

    fn project_exists(&self, project: ProjectId) -> Result<bool> {
        self.db.project_exists(project)
    }

    fn status_overrides_for(&self, project: ProjectId) -> Result<BTreeSet<StatusId>> {
        self.db.status_overrides_for(project)
    }

    fn global_default_statuses(&self) -> Result<BTreeSet<StatusId>> {
        Ok(self.config.default_status_set())
    }

    fn eligible_roles(&self) -> Result<BTreeSet<RoleId>> {
        self.db.eligible_roles()
    }

    fn persisted_transitions(&self, tracker: TrackerId) -> Result<HashSet<Transition>> {
        self.db.persisted_transitions(tracker)
    }

    fn begin_apply(&self) -> Result<Box<dyn ApplyBatch + '_>> {
        Ok(Box::new(self.db.begin_apply()?))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
