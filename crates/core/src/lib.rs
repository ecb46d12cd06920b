//! Binary log retention for a replication source
//!
//! This crate provides:
//! - Log segment types (`LogFile`, `InUseSegment`)
//! - Non-recursive log directory scanning
//! - The retention engine (archive-and-rotate or delete-and-purge)
//! - Structured cleanup reports

pub mod error;
pub mod report;
pub mod retention;
pub mod scanner;
pub mod segment;

// Re-exports
pub use error::{CleanerError, Result};
pub use report::{CleanupReport, Disposal, FailureStage, FileFailure, RetentionMode};
pub use retention::{RetentionConfig, RetentionEngine, RetentionPlan, BACKUP_DIR_NAME};
pub use scanner::{scan_log_directory, DirectoryListing, INDEX_SUFFIX};
pub use segment::{InUseSegment, LogFile};
