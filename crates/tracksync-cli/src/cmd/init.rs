use crate::output::print_json;
use anyhow::Context;
use std::path::Path;
use tracksync_core::types::{StatusId, TrackerId};
use tracksync_core::Workspace;

pub fn run(root: &Path, tracker: u64, default_statuses: Vec<u64>, json: bool) -> anyhow::Result<()> {
    let defaults: Vec<StatusId> = default_statuses.into_iter().map(StatusId).collect();
    let ws = Workspace::init(root, TrackerId(tracker), defaults)
        .context("failed to initialize workspace")?;

    let warnings = ws.config().validate();
    if json {
        print_json(&serde_json::json!({
            "root": root.display().to_string(),
            "config": ws.config(),
            "warnings": warnings,
        }))?;
    } else {
        println!("Initialized tracksync in {}", root.display());
        println!("Tracker: {}", ws.config().tracker);
        for w in &warnings {
            println!("[warning] {}", w.message);
        }
        println!("Run 'tracksync sync' after adding projects and roles.");
    }
    Ok(())
}
