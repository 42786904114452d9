pub mod config;
pub mod init;
pub mod project;
pub mod role;
pub mod status;
pub mod sync;
pub mod transitions;

use anyhow::Context;
use std::path::Path;
use tracksync_core::Workspace;

pub(crate) fn open(root: &Path) -> anyhow::Result<Workspace> {
    Workspace::open(root).with_context(|| format!("failed to open workspace at {}", root.display()))
}
