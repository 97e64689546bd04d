//! Integration tests for the stepring binary.
//!
//! These tests verify end-to-end behavior including:
//! - Calorie estimates and target listing
//! - Recording samples and showing today's dashboard
//! - Authorization fallback and query failures
//! - History export

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Fixed evaluation instant, early evening UTC
const NOW: &str = "2024-07-10T18:00:00+00:00";

/// Helper to create a test data directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Write a config file inside `dir` and return its path
fn write_config(dir: &Path, extra: &str) -> PathBuf {
    let path = dir.join("config.toml");
    let contents = format!(
        "[data]\ndata_dir = {:?}\n{}",
        dir.join("data").display().to_string(),
        extra
    );
    fs::write(&path, contents).expect("Failed to write config");
    path
}

/// Helper to get the CLI with an isolated config, evaluated at [`NOW`]
fn cli(dir: &Path) -> Command {
    cli_at(dir, NOW)
}

/// Same as [`cli`] but evaluated at `now`
fn cli_at(dir: &Path, now: &str) -> Command {
    let config = dir.join("config.toml");
    if !config.exists() {
        write_config(dir, "");
    }
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("stepring"));
    cmd.arg("--config").arg(config).arg("--now").arg(now);
    cmd
}

#[test]
fn test_cli_help() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Daily step ring and calorie estimate"));
}

#[test]
fn test_estimate_uses_table_and_fallback() {
    let temp_dir = setup_test_dir();
    for (steps, expected) in [("0", "0 kcal"), ("3456", "138 kcal"), ("40000", "16000 kcal")] {
        cli(temp_dir.path())
            .arg("estimate")
            .arg(steps)
            .assert()
            .success()
            .stdout(predicate::str::diff(format!("{}\n", expected)));
    }
}

#[test]
fn test_targets_lists_defaults() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .arg("targets")
        .assert()
        .success()
        .stdout(predicate::str::contains("5000 steps (default)"))
        .stdout(predicate::str::contains("10000 steps"))
        .stdout(predicate::str::contains("15000 steps"))
        .stdout(predicate::str::contains("20000 steps"));
}

#[test]
fn test_targets_from_config() {
    let temp_dir = setup_test_dir();
    write_config(
        temp_dir.path(),
        "[targets]\noptions = [3000, 8000]\ndefault = 8000\n",
    );

    cli(temp_dir.path())
        .arg("targets")
        .assert()
        .success()
        .stdout(predicate::str::contains("8000 steps (default)"))
        .stdout(predicate::str::contains("5000").not());
}

#[test]
fn test_show_with_no_data_renders_zero() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("0 kcal"))
        .stdout(predicate::str::contains("0% of 5000 steps"));

    // Authorization was granted and recorded
    assert!(temp_dir.path().join("data/authorization.json").exists());
}

#[test]
fn test_default_command_is_show() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Steps"))
        .stdout(predicate::str::contains("kcal"));
}

#[test]
fn test_record_then_show() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["record", "--steps", "3000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Recorded 3000 steps"));
    cli(temp_dir.path())
        .args(["record", "--steps", "456", "--minutes", "5"])
        .assert()
        .success();

    let samples = fs::read_to_string(temp_dir.path().join("data/step_samples.jsonl"))
        .expect("Failed to read samples");
    assert_eq!(samples.lines().count(), 2);

    cli(temp_dir.path())
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("3456"))
        .stdout(predicate::str::contains("138 kcal"));
}

#[test]
fn test_show_with_selected_target() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["record", "--steps", "5000"])
        .assert()
        .success();

    cli(temp_dir.path())
        .args(["show", "--target", "10000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("50% of 10000 steps"))
        .stdout(predicate::str::contains("200 kcal"))
        .stdout(predicate::str::contains("[10000]"));
}

#[test]
fn test_show_rejects_unknown_target() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["show", "--target", "7777"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Error: 7777 steps is not an available daily target",
        ));
}

#[test]
fn test_denied_access_still_shows_number() {
    let temp_dir = setup_test_dir();
    write_config(temp_dir.path(), "[health]\nauto_grant = false\n");

    cli(temp_dir.path())
        .args(["record", "--steps", "2500"])
        .assert()
        .success();

    cli(temp_dir.path())
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("0 kcal"))
        .stderr(predicate::str::contains("not granted"));
}

#[test]
fn test_samples_from_yesterday_not_counted_today() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .args(["record", "--steps", "9000", "--at", "2024-07-09T12:00:00+00:00"])
        .assert()
        .success();

    cli(temp_dir.path())
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("0 kcal"));

    cli(temp_dir.path())
        .args(["history", "--days", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("9000 steps"))
        .stdout(predicate::str::contains("360 kcal"));
}

#[test]
fn test_record_rejects_bad_timestamp() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["record", "--steps", "10", "--at", "yesterday-ish"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid --at time"));
}

#[test]
fn test_history_exports_csv() {
    let temp_dir = setup_test_dir();
    let csv_path = temp_dir.path().join("export/history.csv");

    cli(temp_dir.path())
        .args(["record", "--steps", "1250"])
        .assert()
        .success();

    cli(temp_dir.path())
        .args(["history", "--days", "3", "--csv"])
        .arg(&csv_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 3 days"));

    let contents = fs::read_to_string(&csv_path).expect("Failed to read CSV");
    let mut lines = contents.lines();
    assert_eq!(lines.next(), Some("date,steps,calories"));
    let today = lines.next().expect("missing today row");
    assert!(today.ends_with(",1250,50"), "unexpected row: {}", today);
    assert_eq!(lines.count(), 2);
}

#[test]
fn test_corrupted_sample_line_is_skipped() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["record", "--steps", "625"])
        .assert()
        .success();

    let samples_path = temp_dir.path().join("data/step_samples.jsonl");
    let mut contents = fs::read_to_string(&samples_path).unwrap();
    contents.push_str("{ not a sample\n");
    fs::write(&samples_path, contents).unwrap();

    cli(temp_dir.path())
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("25 kcal"));
}

#[test]
fn test_day_boundary_follows_now() {
    let temp_dir = setup_test_dir();
    let just_after_midnight = "2024-07-11T00:00:30+00:00";

    // Default start is one minute before --now: 23:59:30 the previous day
    cli_at(temp_dir.path(), just_after_midnight)
        .args(["record", "--steps", "9000"])
        .assert()
        .success();
    cli(temp_dir.path())
        .args(["record", "--steps", "40", "--at", "2024-07-11T00:00:00+00:00"])
        .assert()
        .success();

    cli_at(temp_dir.path(), just_after_midnight)
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 kcal"))
        .stdout(predicate::str::contains("9040").not());
}

#[test]
fn test_history_rejects_out_of_range_days() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["history", "--days", "200000000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("200000000"));

    cli(temp_dir.path())
        .args(["history", "--days", "0"])
        .assert()
        .failure();
}

#[test]
fn test_bad_now_is_reported() {
    let temp_dir = setup_test_dir();

    cli_at(temp_dir.path(), "teatime")
        .arg("show")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid --now time"));
}
