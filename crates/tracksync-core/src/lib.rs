pub mod config;
pub mod db;
pub mod diff;
pub mod error;
pub mod io;
pub mod memory;
pub mod paths;
pub mod permute;
pub mod reconcile;
pub mod resolver;
pub mod store;
pub mod types;
pub mod universe;
pub mod workspace;

pub use error::{Result, SyncError};
pub use reconcile::{plan, synchronize, SyncPlan, SyncReport};
pub use store::{ApplyBatch, WorkflowStore};
pub use workspace::Workspace;
