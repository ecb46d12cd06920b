//! Terminal rendering of run outcomes

use crate::run::RunOutcome;
use crate::util;
use anyhow::{Context, Result};
use binlog_core::{CleanupReport, RetentionMode, RetentionPlan};
use owo_colors::OwoColorize;

/// Print the outcome as pretty JSON on stdout
pub fn print_json(outcome: &RunOutcome) -> Result<()> {
    let json = serde_json::to_string_pretty(outcome).context("Failed to serialize report")?;
    println!("{}", json);
    Ok(())
}

/// Print the outcome for a human
pub fn print_outcome(outcome: &RunOutcome) {
    match &outcome.report {
        None => print_plan(outcome),
        Some(report) => print_report(report),
    }
}

fn print_plan(outcome: &RunOutcome) {
    let plan: &RetentionPlan = &outcome.plan;

    println!("{}", "Dry Run".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("In use:  {}", outcome.in_use.display().cyan());
    println!("Mode:    {}", plan.mode);
    println!("Cutoff:  {}", plan.cutoff.format("%Y-%m-%d %H:%M:%S"));
    println!();

    if !outcome.unreadable.is_empty() {
        println!("{}", "Could not examine (would be skipped):".red());
        for failure in &outcome.unreadable {
            println!("  {} {}", failure.path.display(), failure.error.dimmed());
        }
        println!();
    }

    if plan.deletable.is_empty() {
        println!("{}", "No stale binlogs - nothing to do".dimmed());
        return;
    }

    let verb = match plan.mode {
        RetentionMode::Archive => "archive",
        RetentionMode::Purge => "delete",
    };
    println!("Would {} {} files:", verb, plan.deletable.len().to_string().yellow());
    for file in &plan.deletable {
        println!(
            "  {} {}",
            file.path.display(),
            format!("({} old)", util::format_age(file.age(outcome.started_at))).dimmed()
        );
    }
    if plan.mode == RetentionMode::Purge {
        println!("Would remove all backups");
    }
}

fn print_report(report: &CleanupReport) {
    if report.all_failed() {
        println!("{}", "Cleanup Failed".red().bold());
    } else if report.has_failures() {
        println!("{}", "Cleanup Completed With Errors".yellow().bold());
    } else {
        println!("{}", "Cleanup Complete".green().bold());
    }
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();

    if report.is_noop() && report.failures.is_empty() {
        println!("{}", "No stale binlogs - nothing to do".dimmed());
        return;
    }

    println!("Mode:                {}", report.mode);
    println!("Stale files found:   {}", report.stale_found.to_string().yellow());

    let handled = match report.mode {
        RetentionMode::Archive => "Archived:           ",
        RetentionMode::Purge => "Deleted:            ",
    };
    println!("{} {}", handled, report.succeeded().to_string().green());

    if let Some(generation) = &report.generation {
        println!("Backup generation:   {}", generation.display());
    }

    if !report.pruned_generations.is_empty() {
        println!(
            "Backups removed:     {}",
            report.pruned_generations.join(", ").yellow()
        );
    }

    if report.prune_skipped {
        println!(
            "{}",
            "Older backups kept: some files could not be archived".yellow()
        );
    }

    if report.bytes_reclaimed > 0 {
        println!(
            "Space freed:         {}",
            util::format_size(report.bytes_reclaimed).green()
        );
    }

    let failures = report.failures.iter().chain(report.backup_failures.iter());
    let mut printed_header = false;
    for failure in failures {
        if !printed_header {
            println!();
            println!("{}", "Failures:".red());
            printed_header = true;
        }
        println!(
            "  {} [{:?}] {}",
            failure.path.display(),
            failure.stage,
            failure.error.dimmed()
        );
    }
}
