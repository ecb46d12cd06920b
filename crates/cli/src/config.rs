//! Configuration loading and precedence
//!
//! The optional config file lives at `~/.config/binlog-cleaner/config.toml`
//! (or wherever `--config` points). Command-line flags override it, and
//! built-in defaults fill whatever neither sets.

use crate::credentials::PasswordSource;
use crate::locks;
use anyhow::{Context, Result};
use binlog_core::RetentionConfig;
use replication::{Password, StatusDialect};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Contents of the config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Log directory of the source server
    pub binlog_dir: Option<PathBuf>,

    /// Run lock location
    pub lock_file: Option<PathBuf>,

    /// Replica connection
    pub connection: ConnectionConfig,

    /// Retention settings
    pub retention: RetentionFileConfig,
}

/// `[connection]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password_file: Option<PathBuf>,
    pub password: Option<Password>,
    pub status_dialect: Option<StatusDialect>,
}

/// `[retention]` section
///
/// Options rather than `RetentionConfig` so an unset key does not mask a
/// command-line default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RetentionFileConfig {
    pub threshold_days: Option<u32>,
    pub retention_enabled: Option<bool>,
}

/// Values taken from the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<PasswordSource>,
    pub binlog_dir: Option<PathBuf>,
    pub threshold_days: Option<u32>,
    pub retention_enabled: Option<bool>,
    pub status_dialect: Option<StatusDialect>,
    pub in_use_segment: Option<String>,
    pub lock_file: Option<PathBuf>,
}

/// How the in-use segment is determined
#[derive(Debug, Clone, PartialEq)]
pub enum PositionSource {
    /// Ask the replica
    Replica {
        host: String,
        port: u16,
        user: String,
        password: PasswordSource,
        dialect: StatusDialect,
    },
    /// File name given by the operator
    Static(String),
}

/// Fully resolved settings for one run
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Absolute log directory
    pub binlog_dir: PathBuf,
    pub position: PositionSource,
    pub retention: RetentionConfig,
    pub lock_file: PathBuf,
    pub dry_run: bool,
    pub strict: bool,
}

/// Default config file path
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|c| c.join("binlog-cleaner").join("config.toml"))
}

/// Load the config file
///
/// An explicit path must exist. Without one, the default location is used
/// when present and defaults otherwise.
pub fn load(explicit: Option<&Path>) -> Result<FileConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match config_file_path() {
            Some(path) if path.exists() => path,
            _ => {
                tracing::debug!("No config file found, using defaults");
                return Ok(FileConfig::default());
            }
        },
    };

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config at {}", path.display()))?;

    let config: FileConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config at {}", path.display()))?;

    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Merge command line over file over defaults
pub fn resolve(file: FileConfig, cli: CliOverrides) -> Result<RunSettings> {
    let binlog_dir = cli
        .binlog_dir
        .or(file.binlog_dir)
        .context("A binlog directory is required (--binlog-dir or binlog_dir in the config file)")?;
    let binlog_dir = std::path::absolute(&binlog_dir)
        .with_context(|| format!("Failed to resolve {}", binlog_dir.display()))?;

    let defaults = RetentionConfig::default();
    let retention = RetentionConfig {
        threshold_days: cli
            .threshold_days
            .or(file.retention.threshold_days)
            .unwrap_or(defaults.threshold_days),
        retention_enabled: cli
            .retention_enabled
            .or(file.retention.retention_enabled)
            .unwrap_or(defaults.retention_enabled),
    };

    let position = match cli.in_use_segment {
        Some(segment) => PositionSource::Static(segment),
        None => {
            let conn = file.connection;
            let host = cli
                .host
                .or(conn.host)
                .context("A replica host is required (--host) unless --in-use-segment is given")?;
            let user = cli
                .user
                .or(conn.user)
                .context("A replica user is required (--user)")?;
            let password = cli
                .password
                .or_else(|| conn.password_file.map(PasswordSource::File))
                .or_else(|| conn.password.map(PasswordSource::Literal))
                .context("A password source is required (-P, --password-file or --password)")?;

            PositionSource::Replica {
                host,
                port: cli.port.or(conn.port).unwrap_or(replication::mysql::DEFAULT_PORT),
                user,
                password,
                dialect: cli.status_dialect.or(conn.status_dialect).unwrap_or_default(),
            }
        }
    };

    let lock_file = cli
        .lock_file
        .or(file.lock_file)
        .unwrap_or_else(|| locks::default_lock_path(&binlog_dir));

    Ok(RunSettings {
        binlog_dir,
        position,
        retention,
        lock_file,
        dry_run: false,
        strict: false,
    })
}
