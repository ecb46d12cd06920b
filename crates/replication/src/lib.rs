//! Replica position lookup
//!
//! Asks the replica which source binlog it is currently replaying. That
//! file name bounds what may be removed on the source.

pub mod mysql;

pub use mysql::{ConnectionParams, MySqlPositionProvider, Password, StatusDialect};

use async_trait::async_trait;

/// Errors from the position lookup
///
/// All of them abort the run: guessing the in-use segment is never safe.
#[derive(Debug, thiserror::Error)]
pub enum ReplicationError {
    #[error("Failed to connect to {host}: {source}")]
    Connection {
        host: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Replication is not configured on {host} (empty replica status)")]
    NotConfigured { host: String },

    #[error("Replica status query failed: {0}")]
    QueryFailed(#[source] sqlx::Error),

    #[error("Replica reported an invalid log file name: {0:?}")]
    InvalidLogFileName(String),
}

/// Result type for position lookups
pub type Result<T> = std::result::Result<T, ReplicationError>;

/// Source of the in-use log file name
#[async_trait]
pub trait PositionProvider: Send + Sync {
    /// Short description for logs ("mysql://host:port", "static")
    fn describe(&self) -> String;

    /// File name (no directory) of the segment being replayed
    async fn current_log_file(&self) -> Result<String>;
}

/// Position supplied by the operator instead of queried
#[derive(Debug, Clone)]
pub struct StaticPositionProvider {
    file_name: String,
}

impl StaticPositionProvider {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }
}

#[async_trait]
impl PositionProvider for StaticPositionProvider {
    fn describe(&self) -> String {
        "static position".to_string()
    }

    async fn current_log_file(&self) -> Result<String> {
        validate_log_file_name(&self.file_name)
    }
}

/// Accept only a bare file name
///
/// The name is joined onto the log directory, so separators or `..` would
/// let it point somewhere else.
pub fn validate_log_file_name(name: &str) -> Result<String> {
    let name = name.trim();
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');

    if invalid {
        return Err(ReplicationError::InvalidLogFileName(name.to_string()));
    }

    Ok(name.to_string())
}
