use crate::output::{join_ids, print_json};
use anyhow::Context;
use clap::Subcommand;
use std::collections::BTreeSet;
use std::path::Path;
use tracksync_core::types::StatusId;
use tracksync_core::WorkflowStore;

#[derive(Subcommand)]
pub enum StatusSubcommand {
    /// Show the task statuses in effect for a project
    Show { project: String },
    /// Override a project's task statuses and sync transitions
    Set {
        project: String,
        /// Status ids (space- or comma-separated)
        #[arg(required = true, value_delimiter = ',')]
        statuses: Vec<u64>,
    },
    /// Drop a project's overrides so it uses the defaults, then sync
    Clear { project: String },
    /// Show the status universe across all projects
    Universe,
}

pub fn run(root: &Path, subcmd: StatusSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        StatusSubcommand::Show { project } => show(root, &project, json),
        StatusSubcommand::Set { project, statuses } => {
            let statuses: BTreeSet<StatusId> = statuses.into_iter().map(StatusId).collect();
            set(root, &project, &statuses, json)
        }
        StatusSubcommand::Clear { project } => set(root, &project, &BTreeSet::new(), json),
        StatusSubcommand::Universe => universe(root, json),
    }
}

fn show(root: &Path, project: &str, json: bool) -> anyhow::Result<()> {
    let ws = super::open(root)?;
    let p = ws.project(project)?;
    let overrides = ws
        .status_overrides_for(p.id)
        .context("failed to read status overrides")?;
    let effective = ws.project_statuses(project)?;
    let source = if overrides.is_empty() { "default" } else { "override" };

    if json {
        print_json(&serde_json::json!({
            "project": p.identifier,
            "source": source,
            "statuses": effective,
        }))?;
    } else {
        println!("Project: {}", p.identifier);
        println!("Source:  {source}");
        println!("Statuses: {}", join_ids(&effective));
    }
    Ok(())
}

fn set(root: &Path, project: &str, statuses: &BTreeSet<StatusId>, json: bool) -> anyhow::Result<()> {
    let ws = super::open(root)?;
    ws.replace_project_statuses(project, statuses)
        .with_context(|| format!("failed to update task statuses for '{project}'"))?;
    let report = ws.synchronize().with_context(|| {
        format!("task statuses for '{project}' saved; sync failed, rerun 'tracksync sync'")
    })?;

    if !json {
        if statuses.is_empty() {
            println!("Project '{project}' no longer overrides task statuses; defaults apply.");
        } else {
            println!("Task statuses for '{project}' set to {}.", join_ids(statuses));
        }
    }
    super::sync::print_report(&report, json)
}

fn universe(root: &Path, json: bool) -> anyhow::Result<()> {
    let ws = super::open(root)?;
    let universe = ws.universe().context("failed to compute status universe")?;
    if json {
        print_json(&serde_json::json!({ "statuses": universe }))?;
    } else {
        println!("{}", join_ids(&universe));
    }
    Ok(())
}
