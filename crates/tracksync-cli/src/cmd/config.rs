use crate::output::{join_ids, print_json};
use anyhow::Context;
use clap::Subcommand;
use std::collections::BTreeSet;
use std::path::Path;
use tracksync_core::config::{Config, WarnLevel};
use tracksync_core::types::StatusId;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show the tracker and default task statuses
    Show,
    /// Validate the config for common mistakes
    Validate,
    /// Replace the default task statuses and sync transitions
    SetDefaults {
        /// Status ids (space- or comma-separated)
        #[arg(required = true, value_delimiter = ',')]
        statuses: Vec<u64>,
    },
}

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(root, json),
        ConfigSubcommand::Validate => validate(root, json),
        ConfigSubcommand::SetDefaults { statuses } => {
            let statuses: BTreeSet<StatusId> = statuses.into_iter().map(StatusId).collect();
            set_defaults(root, &statuses, json)
        }
    }
}

fn show(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    if json {
        print_json(&config)?;
    } else {
        println!("Tracker:          {}", config.tracker);
        println!("Default statuses: {}", join_ids(&config.default_status_set()));
    }
    Ok(())
}

fn validate(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let warnings = config.validate();

    if json {
        print_json(&serde_json::json!({ "warnings": warnings }))?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}

fn set_defaults(root: &Path, statuses: &BTreeSet<StatusId>, json: bool) -> anyhow::Result<()> {
    let mut ws = super::open(root)?;
    ws.replace_default_statuses(statuses)
        .context("failed to update default task statuses")?;
    let report = ws
        .synchronize()
        .context("default task statuses saved; sync failed, rerun 'tracksync sync'")?;

    if !json {
        println!("Default task statuses set to {}.", join_ids(statuses));
    }
    super::sync::print_report(&report, json)
}
