//! Cleanup run reports

use chrono::{DateTime, Local};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};

/// Disposal mode of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionMode {
    /// Move stale files into today's backup generation, drop older generations
    Archive,
    /// Delete stale files and the whole backup root
    Purge,
}

impl std::fmt::Display for RetentionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetentionMode::Archive => write!(f, "archive"),
            RetentionMode::Purge => write!(f, "purge"),
        }
    }
}

/// Step at which a single item failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Stat,
    Archive,
    Delete,
    Prune,
}

/// A non-fatal failure recorded against one path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub stage: FailureStage,
    pub error: String,
}

impl FileFailure {
    pub fn new(path: impl AsRef<Path>, stage: FailureStage, error: &io::Error) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            stage,
            error: error.to_string(),
        }
    }
}

/// What happened to a stale file that was handled successfully
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Disposal {
    Archived { from: PathBuf, to: PathBuf },
    Deleted { path: PathBuf },
}

impl Disposal {
    /// Original location of the file
    pub fn source(&self) -> &Path {
        match self {
            Disposal::Archived { from, .. } => from,
            Disposal::Deleted { path } => path,
        }
    }
}

/// Outcome of one cleanup run
#[derive(Debug, Clone, Serialize)]
pub struct CleanupReport {
    pub mode: RetentionMode,
    pub cutoff: DateTime<Local>,
    /// Number of files in the deletable set
    pub stale_found: usize,
    pub disposed: Vec<Disposal>,
    /// Per-file stat/archive/delete failures
    pub failures: Vec<FileFailure>,
    /// Generation directory written by an archive run
    pub generation: Option<PathBuf>,
    /// Names of backup generations removed by this run
    pub pruned_generations: Vec<String>,
    /// Older generations were kept because an archive move failed
    pub prune_skipped: bool,
    pub backup_root_removed: bool,
    pub backup_failures: Vec<FileFailure>,
    pub bytes_reclaimed: u64,
}

impl CleanupReport {
    pub fn new(mode: RetentionMode, cutoff: DateTime<Local>) -> Self {
        Self {
            mode,
            cutoff,
            stale_found: 0,
            disposed: Vec::new(),
            failures: Vec::new(),
            generation: None,
            pruned_generations: Vec::new(),
            prune_skipped: false,
            backup_root_removed: false,
            backup_failures: Vec::new(),
            bytes_reclaimed: 0,
        }
    }

    /// Files archived or deleted
    pub fn succeeded(&self) -> usize {
        self.disposed.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// True when nothing was stale
    pub fn is_noop(&self) -> bool {
        self.stale_found == 0
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty() || !self.backup_failures.is_empty()
    }

    /// Stale files existed but not one of them could be handled
    pub fn all_failed(&self) -> bool {
        self.stale_found > 0 && self.disposed.is_empty()
    }

    /// Attach stat failures found while scanning
    pub fn record_unreadable(&mut self, unreadable: impl IntoIterator<Item = FileFailure>) {
        self.failures.extend(unreadable);
    }
}
