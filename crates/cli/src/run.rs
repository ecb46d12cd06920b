//! One cleanup run, from replica position to report

use crate::config::{PositionSource, RunSettings};
use crate::locks::RunLock;
use anyhow::{Context, Result};
use binlog_core::{
    scan_log_directory, CleanupReport, FileFailure, InUseSegment, RetentionEngine, RetentionPlan,
};
use chrono::{DateTime, Local};
use replication::{
    ConnectionParams, MySqlPositionProvider, PositionProvider, StaticPositionProvider,
};
use serde::Serialize;
use std::path::PathBuf;

/// Everything a run decided and did
#[derive(Debug, Serialize)]
pub struct RunOutcome {
    pub in_use: PathBuf,
    pub started_at: DateTime<Local>,
    pub plan: RetentionPlan,
    /// Entries the scan could not stat, never candidates
    pub unreadable: Vec<FileFailure>,
    /// `None` for dry runs
    pub report: Option<CleanupReport>,
}

impl RunOutcome {
    pub fn is_dry_run(&self) -> bool {
        self.report.is_none()
    }

    /// Whether the process should exit successfully
    ///
    /// Per-file failures only fail the run when nothing succeeded, or in
    /// strict mode. A strict dry run fails on unreadable entries.
    pub fn succeeded(&self, strict: bool) -> bool {
        match &self.report {
            None => !(strict && !self.unreadable.is_empty()),
            Some(report) if report.all_failed() => false,
            Some(report) if strict && report.has_failures() => false,
            Some(_) => true,
        }
    }
}

/// Build the position provider for the configured source
///
/// Resolves the password, which may prompt on the terminal.
pub fn build_provider(position: &PositionSource) -> Result<Box<dyn PositionProvider>> {
    match position {
        PositionSource::Static(file_name) => {
            Ok(Box::new(StaticPositionProvider::new(file_name.clone())))
        }
        PositionSource::Replica {
            host,
            port,
            user,
            password,
            dialect,
        } => {
            let password = password.resolve(user)?;
            let mut params = ConnectionParams::new(host.clone(), user.clone(), password);
            params.port = *port;
            Ok(Box::new(MySqlPositionProvider::new(params, *dialect)))
        }
    }
}

/// Execute one run
///
/// Fatal conditions come back as `Err`; per-file problems are in the
/// outcome's report.
pub async fn execute(settings: &RunSettings, provider: &dyn PositionProvider) -> Result<RunOutcome> {
    tracing::info!(
        "Starting binlog cleaner on {} ({})",
        settings.binlog_dir.display(),
        provider.describe()
    );

    let lock = RunLock::acquire(&settings.lock_file)?;

    let file_name = provider
        .current_log_file()
        .await
        .context("Failed to determine the binlog in use by the replica")?;

    let listing = scan_log_directory(&settings.binlog_dir)
        .context("Failed to scan the binlog directory")?;

    let in_use = InUseSegment::in_directory(&listing.dir, &file_name);
    tracing::info!("Current binlog file in use: {}", in_use.path().display());

    if !listing.files.iter().any(|file| in_use.matches(file)) {
        anyhow::bail!(
            "In-use binlog {} is not present in {}. Is replication pointed at this server?",
            file_name,
            listing.dir.display()
        );
    }

    let now = Local::now();
    let engine = RetentionEngine::new(&listing.dir);
    let plan = engine.plan(&in_use, &listing.files, &settings.retention, now);
    tracing::info!(
        "Mode {}, threshold {} days: {} stale, {} retained",
        plan.mode,
        settings.retention.threshold_days,
        plan.deletable.len(),
        plan.retained
    );

    let report = if settings.dry_run {
        if !listing.unreadable.is_empty() {
            tracing::warn!(
                "{} entries could not be examined and would be skipped",
                listing.unreadable.len()
            );
        }
        tracing::info!("Dry run, nothing changed");
        None
    } else {
        let mut report = engine.apply(&plan, now).context("Cleanup aborted")?;
        report.record_unreadable(listing.unreadable.iter().cloned());

        if report.all_failed() {
            tracing::error!(
                "None of the {} stale binlogs could be handled",
                report.stale_found
            );
        } else if report.has_failures() {
            tracing::warn!(
                "{} files and {} backup entries failed",
                report.failed(),
                report.backup_failures.len()
            );
        }
        Some(report)
    };

    lock.release()?;

    Ok(RunOutcome {
        in_use: in_use.path().to_path_buf(),
        started_at: now,
        plan,
        unreadable: listing.unreadable,
        report,
    })
}
