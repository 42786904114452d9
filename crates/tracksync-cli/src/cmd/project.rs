use crate::output::{join_ids, print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;
use tracksync_core::WorkflowStore;

#[derive(Subcommand)]
pub enum ProjectSubcommand {
    /// Register a project
    Add {
        /// Lowercase identifier (e.g. scrum-team)
        identifier: String,
        /// Display name
        #[arg(long)]
        name: Option<String>,
    },
    /// List projects with their effective task statuses
    List,
}

pub fn run(root: &Path, subcmd: ProjectSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ProjectSubcommand::Add { identifier, name } => add(root, &identifier, name, json),
        ProjectSubcommand::List => list(root, json),
    }
}

fn add(root: &Path, identifier: &str, name: Option<String>, json: bool) -> anyhow::Result<()> {
    let ws = super::open(root)?;
    let project = ws
        .db()
        .add_project(identifier, name)
        .with_context(|| format!("failed to add project '{identifier}'"))?;

    if json {
        print_json(&project)?;
    } else {
        println!("Added project [{}]: {}", project.id, project.identifier);
    }
    Ok(())
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let ws = super::open(root)?;
    let projects = ws.db().list_projects().context("failed to list projects")?;

    #[derive(serde::Serialize)]
    struct Row {
        id: u64,
        identifier: String,
        name: Option<String>,
        overrides: bool,
        statuses: Vec<u64>,
    }

    let mut rows = Vec::with_capacity(projects.len());
    for p in projects {
        let overrides = ws.status_overrides_for(p.id)?;
        let effective = ws.project_statuses(&p.identifier)?;
        rows.push((p, !overrides.is_empty(), effective));
    }

    if json {
        let out: Vec<Row> = rows
            .into_iter()
            .map(|(p, overrides, effective)| Row {
                id: p.id.0,
                identifier: p.identifier,
                name: p.name,
                overrides,
                statuses: effective.into_iter().map(|s| s.0).collect(),
            })
            .collect();
        print_json(&out)?;
        return Ok(());
    }

    if rows.is_empty() {
        println!("No projects.");
        return Ok(());
    }

    let table = rows
        .iter()
        .map(|(p, overrides, effective)| {
            vec![
                p.id.to_string(),
                p.identifier.clone(),
                p.name.clone().unwrap_or_default(),
                if *overrides { "override" } else { "default" }.to_string(),
                join_ids(effective),
            ]
        })
        .collect();
    print_table(&["ID", "IDENTIFIER", "NAME", "SOURCE", "STATUSES"], table);
    Ok(())
}
