//! Run lock so two cleanups never work the same log directory
//!
//! The lock file is never unlinked. Every run opens and `flock`s the same
//! inode, and the kernel drops the lock when the holder exits, so a file
//! left by a crashed run is simply reused.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Attempts before giving up on a lock file that keeps being replaced
const MAX_ATTEMPTS: usize = 3;

/// Held for the whole run
pub struct RunLock {
    path: PathBuf,
    file: File,
}

/// Who holds the lock, for the error message
#[derive(Serialize, Deserialize)]
struct LockContent {
    pid: u32,
    started_at: u64,
}

/// Lock path for a log directory: `<tmp>/binlog-cleaner-<dir>.lock`
pub fn default_lock_path(binlog_dir: &Path) -> PathBuf {
    let sanitized: String = binlog_dir
        .to_string_lossy()
        .trim_matches('/')
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();

    std::env::temp_dir().join(format!("binlog-cleaner-{}.lock", sanitized))
}

impl RunLock {
    /// Acquire the exclusive run lock without blocking
    pub fn acquire(lock_path: &Path) -> Result<Self> {
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create lock directory {}", parent.display()))?;
        }

        for _ in 0..MAX_ATTEMPTS {
            let mut file = open_lock_file(lock_path)?;

            if !try_flock_exclusive(&file)? {
                let holder = read_lock_content(&mut file)
                    .map(|content| format!("pid {}", content.pid))
                    .unwrap_or_else(|_| "unknown pid".to_string());
                anyhow::bail!(
                    "Another cleanup run is in progress ({}, lock held: {})",
                    holder,
                    lock_path.display()
                );
            }

            // Locked an inode that is no longer at the path: start over
            if !is_same_file(&file, lock_path)? {
                tracing::debug!("Lock file {} was replaced, retrying", lock_path.display());
                continue;
            }

            write_lock_content(&mut file)?;
            tracing::debug!("Acquired run lock {}", lock_path.display());

            return Ok(Self {
                path: lock_path.to_path_buf(),
                file,
            });
        }

        anyhow::bail!(
            "Lock file {} keeps changing underneath this run",
            lock_path.display()
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock, leaving the file in place
    pub fn release(self) -> Result<()> {
        unlock(&self.file).context("Failed to release run lock")?;
        tracing::debug!("Released run lock {}", self.path.display());
        Ok(())
    }
}

fn open_lock_file(lock_path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(lock_path)
        .with_context(|| format!("Failed to open lock file {}", lock_path.display()))
}

fn write_lock_content(file: &mut File) -> Result<()> {
    let content = LockContent {
        pid: std::process::id(),
        started_at: current_timestamp_ms(),
    };

    let serialized = serde_json::to_string(&content).context("Failed to serialize lock content")?;

    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(serialized.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

fn read_lock_content(file: &mut File) -> Result<LockContent> {
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).context("Failed to deserialize lock content")
}

/// Whether the open handle and the path name the same inode
#[cfg(unix)]
fn is_same_file(file: &File, path: &Path) -> Result<bool> {
    use std::os::unix::fs::MetadataExt;

    let held = file.metadata()?;
    match std::fs::metadata(path) {
        Ok(current) => Ok(held.dev() == current.dev() && held.ino() == current.ino()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Try to acquire exclusive file lock (non-blocking)
#[cfg(unix)]
fn try_flock_exclusive(file: &File) -> Result<bool> {
    use nix::fcntl::{flock, FlockArg};
    use std::os::unix::io::AsRawFd;

    match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
        Ok(_) => Ok(true),
        Err(nix::errno::Errno::EWOULDBLOCK) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(unix)]
fn unlock(file: &File) -> Result<()> {
    use nix::fcntl::{flock, FlockArg};
    use std::os::unix::io::AsRawFd;

    flock(file.as_raw_fd(), FlockArg::Unlock)?;
    Ok(())
}

fn current_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
