use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::types::{Transition, WriteOp};

/// The write a `synchronize` call stopped at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FailedWrite {
    pub op: WriteOp,
    pub transition: Transition,
}

/// Progress accounting for a `synchronize` call that stopped mid-apply.
///
/// `deleted` and `inserted` count durable writes only. When the batch was
/// transactional and rolled back, both are zero and `rolled_back` is set.
/// `failed` is `None` when every write succeeded but the commit did not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartialApply {
    pub deleted: usize,
    pub inserted: usize,
    pub conflicts: usize,
    pub remaining_deletes: usize,
    pub remaining_inserts: usize,
    pub failed: Option<FailedWrite>,
    pub reason: String,
    pub rolled_back: bool,
}

impl fmt::Display for PartialApply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.failed {
            Some(w) => write!(f, "{} of {}", w.op, w.transition)?,
            None => f.write_str("commit")?,
        }
        write!(
            f,
            " failed after {} deletes and {} inserts ({} deletes, {} inserts not applied",
            self.deleted, self.inserted, self.remaining_deletes, self.remaining_inserts
        )?;
        if self.rolled_back {
            f.write_str(", batch rolled back")?;
        }
        write!(f, "): {}", self.reason)
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("not initialized: run 'tracksync init'")]
    NotInitialized,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("already initialized: {0} has a config; use 'tracksync config set-defaults'")]
    AlreadyInitialized(String),

    #[error("project already exists: {0}")]
    ProjectExists(String),

    #[error("read failed: {0}")]
    ReadFailure(String),

    #[error("transition already exists: {0}")]
    Conflict(Transition),

    #[error("{op} of {transition} failed: {reason}")]
    WriteFailure {
        op: WriteOp,
        transition: Transition,
        reason: String,
    },

    #[error("synchronization stopped: {0}")]
    Incomplete(Box<PartialApply>),

    #[error("database error: {0}")]
    Database(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SyncError>;
