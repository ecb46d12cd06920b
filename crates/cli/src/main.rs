//! binlog-cleaner - retire replicated MySQL binlogs safely

use anyhow::Result;
use clap::Parser;
use cli_lib::config::{self, CliOverrides};
use cli_lib::credentials::PasswordSource;
use cli_lib::{display, logging, run};
use replication::{Password, StatusDialect};
use std::path::PathBuf;
use std::process::ExitCode;

/// Delete or archive source binlogs the replica no longer needs
#[derive(Parser)]
#[command(name = "binlog-cleaner")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// IP address / FQDN / hostname of the replica MySQL server
    #[arg(long)]
    host: Option<String>,

    /// Replica MySQL port (default: 3306)
    #[arg(long)]
    port: Option<u16>,

    /// MySQL user to connect to the replica with
    #[arg(long)]
    user: Option<String>,

    /// Prompt for the replica password
    #[arg(short = 'P', long = "password-prompt", conflicts_with_all = ["password_file", "password"])]
    password_prompt: bool,

    /// Plain text file containing the replica password
    #[arg(long, conflicts_with = "password")]
    password_file: Option<PathBuf>,

    /// Replica password
    #[arg(long)]
    password: Option<String>,

    /// Binlog directory of the source MySQL server
    #[arg(long)]
    binlog_dir: Option<PathBuf>,

    /// Handle binlogs older than this many days (default: 7)
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=36500))]
    threshold: Option<u32>,

    /// Archive stale binlogs into BACKUP/<date> and drop older backups (default)
    #[arg(long, conflicts_with = "disable_retention")]
    enable_retention: bool,

    /// Delete stale binlogs and all backups
    #[arg(long)]
    disable_retention: bool,

    /// Replica status query: legacy (SHOW SLAVE STATUS) or modern (SHOW REPLICA STATUS)
    #[arg(long)]
    status_dialect: Option<StatusDialect>,

    /// Use this binlog file name as the in-use segment instead of asking the replica
    #[arg(long, conflicts_with_all = ["host", "password_prompt", "password_file", "password"])]
    in_use_segment: Option<String>,

    /// Show what would be done without changing anything
    #[arg(long)]
    dry_run: bool,

    /// Exit non-zero if any single file fails
    #[arg(long)]
    strict: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Config file (default: ~/.config/binlog-cleaner/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run lock file
    #[arg(long)]
    lock_file: Option<PathBuf>,

    /// Log file (default: clean_mysql_binlogs.log next to the executable)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        let password = if self.password_prompt {
            Some(PasswordSource::Prompt)
        } else if let Some(path) = &self.password_file {
            Some(PasswordSource::File(path.clone()))
        } else {
            self.password
                .as_ref()
                .map(|p| PasswordSource::Literal(Password::new(p.clone())))
        };

        let retention_enabled = if self.disable_retention {
            Some(false)
        } else if self.enable_retention {
            Some(true)
        } else {
            None
        };

        CliOverrides {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password,
            binlog_dir: self.binlog_dir.clone(),
            threshold_days: self.threshold,
            retention_enabled,
            status_dialect: self.status_dialect,
            in_use_segment: self.in_use_segment.clone(),
            lock_file: self.lock_file.clone(),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_file = cli.log_file.clone().unwrap_or_else(logging::default_log_file);
    let _guard = match logging::init(&log_file, cli.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match execute(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> Result<bool> {
    let file = config::load(cli.config.as_deref())?;
    let mut settings = config::resolve(file, cli.overrides())?;
    settings.dry_run = cli.dry_run;
    settings.strict = cli.strict;

    let provider = run::build_provider(&settings.position)?;
    let outcome = run::execute(&settings, provider.as_ref()).await?;

    if cli.json {
        display::print_json(&outcome)?;
    } else {
        display::print_outcome(&outcome);
    }

    Ok(outcome.succeeded(settings.strict))
}
