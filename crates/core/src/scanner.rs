//! Log directory listing

use crate::error::{CleanerError, Result};
use crate::report::{FailureStage, FileFailure};
use crate::segment::LogFile;
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

/// Suffix of the server's segment index file, never a candidate
pub const INDEX_SUFFIX: &str = ".index";

/// Result of scanning a log directory
#[derive(Debug, Default)]
pub struct DirectoryListing {
    /// Absolute log directory that was scanned
    pub dir: PathBuf,
    /// Regular files, sorted by path
    pub files: Vec<LogFile>,
    /// Entries that could not be stat'ed
    pub unreadable: Vec<FileFailure>,
}

/// List regular files directly inside `dir`
///
/// Index files, directories and symlinks are skipped. The directory itself
/// must exist; per-entry stat errors are collected, not returned.
pub fn scan_log_directory(dir: &Path) -> Result<DirectoryListing> {
    let dir = std::path::absolute(dir).map_err(|source| CleanerError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    if !dir.is_dir() {
        return Err(CleanerError::DirectoryNotFound(dir));
    }

    let entries = fs::read_dir(&dir).map_err(|source| CleanerError::Io {
        path: dir.clone(),
        source,
    })?;

    let mut files = Vec::new();
    let mut unreadable = Vec::new();

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Failed to read entry in {}: {}", dir.display(), e);
                unreadable.push(FileFailure::new(&dir, FailureStage::Stat, &e));
                continue;
            }
        };

        let path = entry.path();
        if is_index_file(&path) {
            continue;
        }

        let metadata = match fs::symlink_metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!("Failed to stat {}: {}", path.display(), e);
                unreadable.push(FileFailure::new(&path, FailureStage::Stat, &e));
                continue;
            }
        };

        if !metadata.is_file() {
            continue;
        }

        match metadata.modified() {
            Ok(modified) => files.push(LogFile::new(path, DateTime::<Local>::from(modified))),
            Err(e) => {
                tracing::warn!("No modification time for {}: {}", path.display(), e);
                unreadable.push(FileFailure::new(&path, FailureStage::Stat, &e));
            }
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    tracing::debug!("Scanned {}: {} files", dir.display(), files.len());

    Ok(DirectoryListing {
        dir,
        files,
        unreadable,
    })
}

fn is_index_file(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().ends_with(INDEX_SUFFIX))
        .unwrap_or(false)
}
