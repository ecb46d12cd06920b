//! Scratch binlog directories

use chrono::{Duration, Local};
use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const IN_USE: &str = "mysql-bin.000050";

/// A fake source server binlog directory plus a scratch area
pub struct BinlogDir {
    root: TempDir,
    dir: PathBuf,
}

impl BinlogDir {
    pub fn new() -> Self {
        let root = TempDir::new().expect("Failed to create temp dir");
        let dir = root.path().join("binlogs");
        fs::create_dir(&dir).unwrap();
        fs::create_dir(root.path().join("scratch")).unwrap();
        Self { root, dir }
    }

    /// Binlog directory whose absolute path is exactly `path_len` bytes long
    pub fn nested(path_len: usize) -> Self {
        let mut fixture = Self::new();
        let mut dir = fixture.dir.clone();
        loop {
            let remaining = path_len - dir.as_os_str().len() - 1;
            if remaining <= 200 {
                dir.push("d".repeat(remaining));
                break;
            }
            dir.push("d".repeat(200));
        }
        fs::create_dir_all(&dir).unwrap();
        assert_eq!(dir.as_os_str().len(), path_len);
        fixture.dir = dir;
        fixture
    }

    /// The usual layout: 000040 (10 days), 000045 (3 days), in-use 000050 (10 days)
    pub fn with_scenario() -> Self {
        let fixture = Self::new();
        fixture.write_log("mysql-bin.000040", 10);
        fixture.write_log("mysql-bin.000045", 3);
        fixture.write_log(IN_USE, 10);
        fixture.write_log("mysql-bin.index", 30);
        fixture
    }

    pub fn dir(&self) -> PathBuf {
        self.dir.clone()
    }

    pub fn scratch(&self) -> PathBuf {
        self.root.path().join("scratch")
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir().join(name)
    }

    /// Write a binlog whose mtime is `age_days` in the past
    pub fn write_log(&self, name: &str, age_days: i64) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, name.as_bytes()).unwrap();
        let modified = Local::now() - Duration::days(age_days);
        set_file_mtime(&path, FileTime::from_unix_time(modified.timestamp(), 0)).unwrap();
        path
    }

    /// Create an old backup generation
    pub fn write_generation(&self, name: &str) -> PathBuf {
        let generation = self.dir().join("BACKUP").join(name);
        fs::create_dir_all(&generation).unwrap();
        fs::write(generation.join("mysql-bin.000001"), b"old").unwrap();
        generation
    }

    pub fn backup_root(&self) -> PathBuf {
        self.dir().join("BACKUP")
    }

    pub fn today(&self) -> String {
        Local::now().format("%Y%m%d").to_string()
    }

    pub fn exists(&self, relative: impl AsRef<Path>) -> bool {
        self.dir().join(relative).exists()
    }
}
