use crate::output::{join_ids, print_json, print_table};
use anyhow::Context;
use std::path::Path;
use tracksync_core::SyncReport;

pub fn plan(root: &Path, json: bool) -> anyhow::Result<()> {
    let ws = super::open(root)?;
    let plan = ws.plan().context("failed to plan transitions")?;
    let inserts = plan.diff.sorted_inserts();
    let deletes = plan.diff.sorted_deletes();

    if json {
        print_json(&serde_json::json!({
            "tracker": plan.tracker,
            "universe": plan.universe,
            "roles": plan.roles,
            "required": plan.required.len(),
            "to_insert": inserts,
            "to_delete": deletes,
        }))?;
        return Ok(());
    }

    println!("Tracker:  {}", plan.tracker);
    println!("Statuses: {}", join_ids(&plan.universe));
    println!("Roles:    {}", join_ids(&plan.roles));
    println!("Required: {}", plan.required.len());
    if plan.is_converged() {
        println!("Transitions are up to date.");
        return Ok(());
    }

    let rows = deletes
        .iter()
        .map(|t| ("delete", t))
        .chain(inserts.iter().map(|t| ("insert", t)))
        .map(|(op, t)| {
            vec![
                op.to_string(),
                t.role.to_string(),
                t.from.to_string(),
                t.to.to_string(),
            ]
        })
        .collect();
    print_table(&["ACTION", "ROLE", "FROM", "TO"], rows);
    Ok(())
}

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let ws = super::open(root)?;
    let report = ws.synchronize().context("failed to synchronize transitions")?;
    print_report(&report, json)
}

pub(crate) fn print_report(report: &SyncReport, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(report);
    }
    println!(
        "Synchronized tracker {}: {} inserted, {} deleted ({} required over {} statuses and {} roles)",
        report.tracker,
        report.inserted,
        report.deleted,
        report.required,
        report.universe_size,
        report.role_count
    );
    if report.conflicts > 0 {
        println!("{} transitions were already present.", report.conflicts);
    }
    Ok(())
}
