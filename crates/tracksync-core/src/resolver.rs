use std::collections::BTreeSet;

use crate::error::{Result, SyncError};
use crate::store::WorkflowStore;
use crate::types::{ProjectId, StatusId};

/// Statuses in effect for `project`: its overrides when it has any, the
/// global defaults otherwise. Overrides replace the defaults, never extend them.
pub fn resolve<S: WorkflowStore + ?Sized>(store: &S, project: ProjectId) -> Result<BTreeSet<StatusId>> {
    if !store.project_exists(project)? {
        return Err(SyncError::InvalidInput(format!("unknown project {project}")));
    }
    let overrides = store.status_overrides_for(project)?;
    if overrides.is_empty() {
        return store.global_default_statuses();
    }
    Ok(overrides)
}
