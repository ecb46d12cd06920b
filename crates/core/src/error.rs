//! Fatal errors
//!
//! Anything in here aborts the run. Per-file problems are reported through
//! [`crate::FileFailure`] instead.

use std::io;
use std::path::PathBuf;

/// Errors that stop a cleanup run
#[derive(Debug, thiserror::Error)]
pub enum CleanerError {
    #[error("Log directory not found or not a directory: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("Failed to create backup generation {}: {source}", .path.display())]
    BackupGeneration {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type for cleanup operations
pub type Result<T> = std::result::Result<T, CleanerError>;
