//! CLI command execution helpers
//!
//! Wraps the `binlog-cleaner` binary with per-test lock and log files so
//! runs never touch shared locations.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// CLI command builder
pub struct CleanerCommand {
    binlog_dir: PathBuf,
    scratch_dir: PathBuf,
    args: Vec<String>,
}

impl CleanerCommand {
    /// Command against `binlog_dir`; lock and log files go to `scratch_dir`
    pub fn new(binlog_dir: impl AsRef<Path>, scratch_dir: impl AsRef<Path>) -> Self {
        Self {
            binlog_dir: binlog_dir.as_ref().to_path_buf(),
            scratch_dir: scratch_dir.as_ref().to_path_buf(),
            args: Vec::new(),
        }
    }

    /// Add command arguments
    pub fn args(&mut self, args: &[&str]) -> &mut Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn execute(&self) -> Result<CommandResult> {
        let output = Command::new(env!("CARGO_BIN_EXE_binlog-cleaner"))
            .arg("--binlog-dir")
            .arg(&self.binlog_dir)
            .arg("--lock-file")
            .arg(self.scratch_dir.join("run.lock"))
            .arg("--log-file")
            .arg(self.scratch_dir.join("cleaner.log"))
            .args(&self.args)
            // Keep stderr free of ANSI noise and unaffected by the caller's filter
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1")
            .output()
            .context("Failed to execute binlog-cleaner")?;

        Ok(CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    /// Execute and assert success
    pub fn assert_success(&self) -> Result<CommandResult> {
        let result = self.execute()?;

        if !result.success() {
            anyhow::bail!(
                "Command failed (exit code: {}):\nArgs: {:?}\nStdout: {}\nStderr: {}",
                result.exit_code,
                self.args,
                result.stdout,
                result.stderr
            );
        }

        Ok(result)
    }

    /// Execute and expect failure
    pub fn assert_failure(&self) -> Result<CommandResult> {
        let result = self.execute()?;

        if result.success() {
            anyhow::bail!(
                "Command should have failed but succeeded:\nArgs: {:?}\nStdout: {}",
                self.args,
                result.stdout
            );
        }

        Ok(result)
    }
}

/// Command execution result
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn contains_stdout(&self, text: &str) -> bool {
        self.stdout.contains(text)
    }

    pub fn contains_stderr(&self, text: &str) -> bool {
        self.stderr.contains(text)
    }

    /// Parse stdout as JSON (for `--json` runs)
    pub fn json(&self) -> Result<serde_json::Value> {
        serde_json::from_str(&self.stdout).context("stdout is not valid JSON")
    }
}

/// Macro for convenient command construction
///
/// Usage:
/// ```
/// cleaner!(fixture, "--in-use-segment", "mysql-bin.000050").assert_success()?;
/// ```
#[macro_export]
macro_rules! cleaner {
    ($fixture:expr, $($arg:expr),*) => {{
        let mut cmd = $crate::common::cli::CleanerCommand::new($fixture.dir(), $fixture.scratch());
        cmd.args(&[$($arg),*]);
        cmd
    }};
}
