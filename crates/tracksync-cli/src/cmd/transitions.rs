use crate::output::{print_json, print_table};
use anyhow::Context;
use std::path::Path;
use tracksync_core::types::Transition;
use tracksync_core::WorkflowStore;

pub fn run(root: &Path, role: Option<u64>, json: bool) -> anyhow::Result<()> {
    let ws = super::open(root)?;
    let tracker = ws.tracker_id();
    let mut transitions: Vec<Transition> = ws
        .persisted_transitions(tracker)
        .context("failed to read transitions")?
        .into_iter()
        .filter(|t| role.map_or(true, |r| t.role.0 == r))
        .collect();
    transitions.sort();

    if json {
        print_json(&transitions)?;
        return Ok(());
    }
    if transitions.is_empty() {
        println!("No transitions for tracker {tracker}.");
        return Ok(());
    }
    let rows = transitions
        .iter()
        .map(|t| vec![t.role.to_string(), t.from.to_string(), t.to.to_string()])
        .collect();
    print_table(&["ROLE", "FROM", "TO"], rows);
    Ok(())
}
