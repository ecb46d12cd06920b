//! Integration tests for the binlog-cleaner binary
//!
//! Every run uses `--in-use-segment`, so no replica is needed.

#[macro_use]
mod common;

use anyhow::Result;
use common::fixtures::IN_USE;
use common::BinlogDir;
use std::fs;

#[test]
fn test_archive_run() -> Result<()> {
    let fixture = BinlogDir::with_scenario();

    let result = cleaner!(fixture, "--in-use-segment", IN_USE).assert_success()?;
    assert!(result.contains_stdout("Cleanup Complete"));

    let generation = fixture.backup_root().join(fixture.today());
    assert!(generation.join("mysql-bin.000040").exists());
    assert!(!fixture.exists("mysql-bin.000040"));
    assert!(fixture.exists("mysql-bin.000045"));
    assert!(fixture.exists(IN_USE));
    assert!(fixture.exists("mysql-bin.index"));

    // Log file written where asked
    assert!(fixture.scratch().join("cleaner.log").exists());
    // Lock released, file kept for the next run
    let lock = cli_lib::locks::RunLock::acquire(&fixture.scratch().join("run.lock"));
    assert!(lock.is_ok());
    Ok(())
}

#[test]
fn test_purge_run_json() -> Result<()> {
    let fixture = BinlogDir::with_scenario();
    fixture.write_generation("20200101");
    fixture.write_generation("20200102");

    let result = cleaner!(
        fixture,
        "--in-use-segment",
        IN_USE,
        "--disable-retention",
        "--json"
    )
    .assert_success()?;

    let json = result.json()?;
    assert_eq!(json["report"]["mode"], "purge");
    assert_eq!(json["report"]["stale_found"], 1);
    assert_eq!(json["report"]["backup_root_removed"], true);
    assert_eq!(
        json["report"]["pruned_generations"],
        serde_json::json!(["20200101", "20200102"])
    );

    assert!(!fixture.backup_root().exists());
    assert!(!fixture.exists("mysql-bin.000040"));
    assert!(fixture.exists(IN_USE));
    Ok(())
}

#[test]
fn test_nothing_stale() -> Result<()> {
    let fixture = BinlogDir::new();
    fixture.write_log("mysql-bin.000049", 2);
    fixture.write_log(IN_USE, 1);
    let generation = fixture.write_generation("20200101");

    let result = cleaner!(fixture, "--in-use-segment", IN_USE).assert_success()?;

    assert!(result.contains_stdout("nothing to do"));
    assert!(generation.exists());
    assert!(fixture.exists("mysql-bin.000049"));
    Ok(())
}

#[test]
fn test_threshold_flag() -> Result<()> {
    let fixture = BinlogDir::with_scenario();

    cleaner!(
        fixture,
        "--in-use-segment",
        IN_USE,
        "--threshold",
        "2",
        "--disable-retention"
    )
    .assert_success()?;

    assert!(!fixture.exists("mysql-bin.000040"));
    assert!(!fixture.exists("mysql-bin.000045"));
    assert!(fixture.exists(IN_USE));
    Ok(())
}

#[test]
fn test_dry_run_changes_nothing() -> Result<()> {
    let fixture = BinlogDir::with_scenario();
    fixture.write_generation("20200101");

    let result = cleaner!(
        fixture,
        "--in-use-segment",
        IN_USE,
        "--disable-retention",
        "--dry-run"
    )
    .assert_success()?;

    assert!(result.contains_stdout("Dry Run"));
    assert!(result.contains_stdout("mysql-bin.000040"));
    assert!(fixture.exists("mysql-bin.000040"));
    assert!(fixture.backup_root().join("20200101").exists());
    Ok(())
}

#[test]
fn test_missing_directory_fails() -> Result<()> {
    let fixture = BinlogDir::new();
    fs::remove_dir(fixture.dir())?;

    let result = cleaner!(fixture, "--in-use-segment", IN_USE).assert_failure()?;
    assert_eq!(result.exit_code, 1);
    assert!(result.contains_stderr("Failed to scan the binlog directory"));
    Ok(())
}

#[cfg(target_os = "linux")]
#[test]
fn test_nothing_archived_fails() -> Result<()> {
    // Files fit under PATH_MAX but their archive destinations do not
    let fixture = BinlogDir::nested(4070);
    fixture.write_log("mysql-bin.000040", 10);
    fixture.write_log(IN_USE, 1);

    let result = cleaner!(fixture, "--in-use-segment", IN_USE).assert_failure()?;
    assert_eq!(result.exit_code, 1);
    assert!(result.contains_stdout("Cleanup Failed"));
    assert!(result.contains_stdout("Older backups kept"));
    assert!(fixture.exists("mysql-bin.000040"));
    Ok(())
}

#[cfg(target_os = "linux")]
#[test]
fn test_nothing_archived_json_reports_failures() -> Result<()> {
    let fixture = BinlogDir::nested(4070);
    fixture.write_log("mysql-bin.000040", 10);
    fixture.write_log(IN_USE, 1);

    let result = cleaner!(fixture, "--in-use-segment", IN_USE, "--json").assert_failure()?;
    let json = result.json()?;
    assert_eq!(json["report"]["stale_found"], 1);
    assert_eq!(json["report"]["failures"][0]["stage"], "archive");
    assert_eq!(json["report"]["prune_skipped"], true);
    Ok(())
}

#[test]
fn test_in_use_not_in_directory_fails() -> Result<()> {
    let fixture = BinlogDir::with_scenario();

    let result = cleaner!(fixture, "--in-use-segment", "mysql-bin.000099").assert_failure()?;
    assert!(result.contains_stderr("is not present in"));
    assert!(fixture.exists("mysql-bin.000040"));
    Ok(())
}

#[test]
fn test_unsafe_segment_name_fails() -> Result<()> {
    let fixture = BinlogDir::with_scenario();

    cleaner!(fixture, "--in-use-segment", "../mysql-bin.000050").assert_failure()?;
    assert!(fixture.exists("mysql-bin.000040"));
    Ok(())
}

#[test]
fn test_replica_settings_required() -> Result<()> {
    let fixture = BinlogDir::with_scenario();

    let result = cleaner!(fixture, "--user", "monitor").assert_failure()?;
    assert!(result.contains_stderr("replica host is required"));
    Ok(())
}

#[test]
fn test_conflicting_password_sources() -> Result<()> {
    let fixture = BinlogDir::with_scenario();

    cleaner!(
        fixture,
        "--host",
        "replica",
        "--user",
        "monitor",
        "--password",
        "a",
        "--password-file",
        "/tmp/pw"
    )
    .assert_failure()?;
    Ok(())
}

#[test]
fn test_config_file() -> Result<()> {
    let fixture = BinlogDir::with_scenario();
    let config_path = fixture.scratch().join("config.toml");
    fs::write(
        &config_path,
        "[retention]\nthreshold_days = 2\nretention_enabled = false\n",
    )?;
    let config_arg = config_path.to_string_lossy().to_string();

    cleaner!(fixture, "--in-use-segment", IN_USE, "--config", &config_arg).assert_success()?;

    assert!(!fixture.exists("mysql-bin.000045"));
    assert!(!fixture.backup_root().exists());
    Ok(())
}
