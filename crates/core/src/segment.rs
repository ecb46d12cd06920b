//! Log segment identity

use chrono::{DateTime, Local};
use serde::Serialize;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// One file found in the log directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogFile {
    /// Absolute path (identity of the file)
    pub path: PathBuf,
    /// Last modification time
    pub modified_at: DateTime<Local>,
}

impl LogFile {
    pub fn new(path: impl Into<PathBuf>, modified_at: DateTime<Local>) -> Self {
        Self {
            path: path.into(),
            modified_at,
        }
    }

    pub fn file_name(&self) -> Option<&OsStr> {
        self.path.file_name()
    }

    /// Time elapsed between the last modification and `now`
    pub fn age(&self, now: DateTime<Local>) -> chrono::Duration {
        now.signed_duration_since(self.modified_at)
    }
}

/// The segment the replica is currently replaying
///
/// Never part of a deletable set, whatever its age.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InUseSegment(PathBuf);

impl InUseSegment {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Build from the file name reported by the replica
    pub fn in_directory(log_dir: &Path, file_name: &str) -> Self {
        Self(log_dir.join(file_name))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    pub fn matches(&self, file: &LogFile) -> bool {
        self.0 == file.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_in_use_matches_by_path_only() {
        let now = Local::now();
        let in_use = InUseSegment::in_directory(Path::new("/var/lib/mysql"), "mysql-bin.000050");

        let same = LogFile::new("/var/lib/mysql/mysql-bin.000050", now - Duration::days(30));
        let other = LogFile::new("/var/lib/mysql/mysql-bin.000049", now);

        assert!(in_use.matches(&same));
        assert!(!in_use.matches(&other));
    }

    #[test]
    fn test_age() {
        let now = Local::now();
        let file = LogFile::new("/tmp/mysql-bin.000001", now - Duration::hours(36));
        assert_eq!(file.age(now), Duration::hours(36));
    }
}
