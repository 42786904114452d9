use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum RoleSubcommand {
    /// Register a role
    Add {
        #[arg(required = true)]
        name: Vec<String>,
        /// Built-in roles never receive transitions
        #[arg(long)]
        builtin: bool,
    },
    /// List roles
    List,
}

pub fn run(root: &Path, subcmd: RoleSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        RoleSubcommand::Add { name, builtin } => add(root, &name.join(" "), builtin, json),
        RoleSubcommand::List => list(root, json),
    }
}

fn add(root: &Path, name: &str, builtin: bool, json: bool) -> anyhow::Result<()> {
    let ws = super::open(root)?;
    let role = ws
        .db()
        .add_role(name, builtin)
        .with_context(|| format!("failed to add role '{name}'"))?;

    if json {
        print_json(&role)?;
    } else {
        let kind = if role.builtin { " (built-in)" } else { "" };
        println!("Added role [{}]: {}{kind}", role.id, role.name);
    }
    Ok(())
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let ws = super::open(root)?;
    let roles = ws.db().list_roles().context("failed to list roles")?;

    if json {
        print_json(&roles)?;
        return Ok(());
    }
    if roles.is_empty() {
        println!("No roles.");
        return Ok(());
    }
    let rows = roles
        .iter()
        .map(|r| {
            vec![
                r.id.to_string(),
                r.name.clone(),
                if r.builtin { "no" } else { "yes" }.to_string(),
            ]
        })
        .collect();
    print_table(&["ID", "NAME", "ELIGIBLE"], rows);
    Ok(())
}
