//! Retention policy and the cleanup engine
//!
//! A run computes the deletable set (stale files that are neither the
//! in-use segment nor part of the backup tree), then disposes of it:
//!
//! ```text
//! archive:  <log-dir>/BACKUP/<YYYYMMDD>/<stale files>   older generations removed
//! purge:    stale files removed in place               <log-dir>/BACKUP removed
//! ```

use crate::error::{CleanerError, Result};
use crate::report::{CleanupReport, Disposal, FailureStage, FileFailure, RetentionMode};
use crate::segment::{InUseSegment, LogFile};
use chrono::{DateTime, Duration, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Name of the backup root inside the log directory
pub const BACKUP_DIR_NAME: &str = "BACKUP";

/// Backup generation directory name (local calendar date)
pub const GENERATION_FORMAT: &str = "%Y%m%d";

const SECONDS_PER_DAY: i64 = 86_400;

/// Thresholds above this are clamped (keeps the cutoff inside chrono's range)
const MAX_THRESHOLD_DAYS: u32 = 100_000;

/// Retention configuration for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Minimum age in days before a file becomes stale (default: 7)
    pub threshold_days: u32,
    /// Archive stale files instead of deleting them (default: true)
    pub retention_enabled: bool,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            threshold_days: 7,
            retention_enabled: true,
        }
    }
}

impl RetentionConfig {
    pub fn mode(&self) -> RetentionMode {
        if self.retention_enabled {
            RetentionMode::Archive
        } else {
            RetentionMode::Purge
        }
    }

    /// Files modified strictly before this instant are stale
    pub fn cutoff(&self, now: DateTime<Local>) -> DateTime<Local> {
        let days = self.threshold_days.min(MAX_THRESHOLD_DAYS);
        now - Duration::seconds(i64::from(days) * SECONDS_PER_DAY)
    }
}

/// The pure decision part of a run
#[derive(Debug, Clone, Serialize)]
pub struct RetentionPlan {
    pub mode: RetentionMode,
    pub cutoff: DateTime<Local>,
    /// Files to archive or delete, in listing order
    pub deletable: Vec<LogFile>,
    /// Number of candidates kept
    pub retained: usize,
}

impl RetentionPlan {
    pub fn is_empty(&self) -> bool {
        self.deletable.is_empty()
    }
}

/// Cleanup engine bound to one log directory
pub struct RetentionEngine {
    log_dir: PathBuf,
    backup_root: PathBuf,
}

impl RetentionEngine {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let log_dir = log_dir.into();
        let backup_root = log_dir.join(BACKUP_DIR_NAME);
        Self {
            log_dir,
            backup_root,
        }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn backup_root(&self) -> &Path {
        &self.backup_root
    }

    /// Backup generation directory for the day of `now`
    pub fn generation_path(&self, now: DateTime<Local>) -> PathBuf {
        self.backup_root.join(generation_name(now))
    }

    /// Compute the deletable set without touching the filesystem
    pub fn plan(
        &self,
        in_use: &InUseSegment,
        candidates: &[LogFile],
        config: &RetentionConfig,
        now: DateTime<Local>,
    ) -> RetentionPlan {
        let cutoff = config.cutoff(now);

        let deletable: Vec<LogFile> = candidates
            .iter()
            .filter(|file| !in_use.matches(file))
            .filter(|file| !file.path.starts_with(&self.backup_root))
            .filter(|file| file.modified_at < cutoff)
            .cloned()
            .collect();

        RetentionPlan {
            mode: config.mode(),
            cutoff,
            retained: candidates.len() - deletable.len(),
            deletable,
        }
    }

    /// Plan and apply one cleanup run
    ///
    /// Returns an error only for conditions that abort the run; per-file
    /// problems end up in the report.
    pub fn clean(
        &self,
        in_use: &InUseSegment,
        candidates: &[LogFile],
        config: &RetentionConfig,
        now: DateTime<Local>,
    ) -> Result<CleanupReport> {
        let plan = self.plan(in_use, candidates, config, now);
        self.apply(&plan, now)
    }

    /// Apply a previously computed plan
    pub fn apply(&self, plan: &RetentionPlan, now: DateTime<Local>) -> Result<CleanupReport> {
        let mut report = CleanupReport::new(plan.mode, plan.cutoff);
        report.stale_found = plan.deletable.len();

        tracing::info!(
            "{} stale log files found (cutoff {})",
            plan.deletable.len(),
            plan.cutoff.format("%Y-%m-%d %H:%M:%S")
        );

        if plan.is_empty() {
            return Ok(report);
        }

        match plan.mode {
            RetentionMode::Archive => {
                tracing::info!("Retention enabled: archiving stale logs and pruning older backups");
                self.archive(&plan.deletable, now, &mut report)?;
            }
            RetentionMode::Purge => {
                tracing::info!("Retention disabled: deleting stale logs and all backups");
                self.purge(&plan.deletable, &mut report);
            }
        }

        tracing::info!(
            "Cleanup completed: {} handled, {} failed, {} generations pruned",
            report.succeeded(),
            report.failed(),
            report.pruned_generations.len()
        );

        Ok(report)
    }

    fn archive(
        &self,
        deletable: &[LogFile],
        now: DateTime<Local>,
        report: &mut CleanupReport,
    ) -> Result<()> {
        let name = generation_name(now);
        let generation = self.backup_root.join(&name);

        self.replace_generation(&generation)?;
        report.generation = Some(generation.clone());

        for file in deletable {
            tracing::debug!("Moving {} to {}", file.path.display(), generation.display());
            match move_into(&file.path, &generation) {
                Ok(to) => report.disposed.push(Disposal::Archived {
                    from: file.path.clone(),
                    to,
                }),
                Err(e) => {
                    tracing::warn!("Failed to archive {}: {}", file.path.display(), e);
                    report
                        .failures
                        .push(FileFailure::new(&file.path, FailureStage::Archive, &e));
                }
            }
        }

        if report.failures.is_empty() {
            self.prune_generations(&name, report);
        } else {
            // Older generations may be the only copy of anything left behind
            tracing::warn!(
                "{} files could not be archived, keeping older backups in {}",
                report.failed(),
                self.backup_root.display()
            );
            report.prune_skipped = true;
        }
        Ok(())
    }

    /// Remove any same-day generation, then create it empty
    fn replace_generation(&self, generation: &Path) -> Result<()> {
        let to_fatal = |source: io::Error| CleanerError::BackupGeneration {
            path: generation.to_path_buf(),
            source,
        };

        match fs::symlink_metadata(generation) {
            Ok(_) => {
                tracing::debug!("Replacing existing generation {}", generation.display());
                remove_path(generation).map_err(to_fatal)?;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(to_fatal(e)),
        }

        fs::create_dir_all(generation).map_err(to_fatal)
    }

    /// Drop every entry of the backup root except `keep`
    fn prune_generations(&self, keep: &str, report: &mut CleanupReport) {
        tracing::debug!("Pruning older backups from {}", self.backup_root.display());

        let entries = match fs::read_dir(&self.backup_root) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!("Failed to list {}: {}", self.backup_root.display(), e);
                report
                    .backup_failures
                    .push(FileFailure::new(&self.backup_root, FailureStage::Prune, &e));
                return;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    report
                        .backup_failures
                        .push(FileFailure::new(&self.backup_root, FailureStage::Prune, &e));
                    continue;
                }
            };

            let name = entry.file_name().to_string_lossy().into_owned();
            if name == keep {
                continue;
            }

            let path = entry.path();
            let size = tree_size(&path);
            match remove_path(&path) {
                Ok(()) => {
                    tracing::debug!("Pruned backup generation {}", name);
                    report.pruned_generations.push(name);
                    report.bytes_reclaimed += size;
                }
                Err(e) => {
                    tracing::error!("Failed to prune {}: {}", path.display(), e);
                    report
                        .backup_failures
                        .push(FileFailure::new(&path, FailureStage::Prune, &e));
                }
            }
        }

        report.pruned_generations.sort();
    }

    fn purge(&self, deletable: &[LogFile], report: &mut CleanupReport) {
        for file in deletable {
            tracing::debug!("Deleting {}", file.path.display());
            let size = fs::symlink_metadata(&file.path).map(|m| m.len()).unwrap_or(0);
            match fs::remove_file(&file.path) {
                Ok(()) => {
                    report.bytes_reclaimed += size;
                    report.disposed.push(Disposal::Deleted {
                        path: file.path.clone(),
                    });
                }
                Err(e) => {
                    tracing::warn!("Failed to delete {}: {}", file.path.display(), e);
                    report
                        .failures
                        .push(FileFailure::new(&file.path, FailureStage::Delete, &e));
                }
            }
        }

        match fs::symlink_metadata(&self.backup_root) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return,
            Err(e) => {
                report
                    .backup_failures
                    .push(FileFailure::new(&self.backup_root, FailureStage::Prune, &e));
                return;
            }
        }

        let generations = list_names(&self.backup_root);
        let size = tree_size(&self.backup_root);
        match remove_path(&self.backup_root) {
            Ok(()) => {
                tracing::debug!("Removed backup root {}", self.backup_root.display());
                report.pruned_generations = generations;
                report.backup_root_removed = true;
                report.bytes_reclaimed += size;
            }
            Err(e) => {
                tracing::error!("Failed to remove {}: {}", self.backup_root.display(), e);
                report
                    .backup_failures
                    .push(FileFailure::new(&self.backup_root, FailureStage::Prune, &e));
            }
        }
    }
}

fn generation_name(now: DateTime<Local>) -> String {
    now.format(GENERATION_FORMAT).to_string()
}

/// Move `source` into `dir`, keeping its file name
fn move_into(source: &Path, dir: &Path) -> io::Result<PathBuf> {
    let name = source
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let dest = dir.join(name);

    match fs::rename(source, &dest) {
        Ok(()) => Ok(dest),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            copy_then_remove(source, &dest)?;
            Ok(dest)
        }
        Err(e) => Err(e),
    }
}

/// Copy `source` to `dest` and remove `source`, leaving exactly one copy
fn copy_then_remove(source: &Path, dest: &Path) -> io::Result<()> {
    let result = fs::copy(source, dest).and_then(|_| fs::remove_file(source));
    if result.is_err() {
        let _ = fs::remove_file(dest);
    }
    result
}

fn remove_path(path: &Path) -> io::Result<()> {
    if fs::symlink_metadata(path)?.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Total size of regular files under `path`
fn tree_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|metadata| metadata.len())
        .sum()
}

fn list_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
