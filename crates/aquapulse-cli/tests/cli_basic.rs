//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run against the dev data directory
//! and verify outputs. Only read-only or rejected commands are used so the
//! tests can run in parallel.

use std::process::Command;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(args: &[&str]) -> (String, String, i32) {
    let output = Command::new("cargo")
        .args(["run", "-q", "-p", "aquapulse-cli", "--"])
        .args(args)
        .env("AQUAPULSE_ENV", "dev")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

#[test]
fn test_help_lists_commands() {
    let (stdout, _, code) = run_cli(&["--help"]);
    assert_eq!(code, 0);
    for name in ["reminder", "stats", "config", "run", "completions"] {
        assert!(stdout.contains(name), "missing {name} in help");
    }
}

#[test]
fn test_reminder_status_is_json() {
    let (stdout, stderr, code) = run_cli(&["reminder", "status"]);
    assert_eq!(code, 0, "reminder status failed: {stderr}");
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let interval = parsed["current_interval_minutes"].as_u64().unwrap();
    assert!((20..=120).contains(&interval));
    assert!(parsed["escalation_level"].is_string());
}

#[test]
fn test_reminder_next_is_json() {
    let (stdout, stderr, code) = run_cli(&["reminder", "next"]);
    assert_eq!(code, 0, "reminder next failed: {stderr}");
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(parsed["message"].as_str().is_some_and(|m| !m.is_empty()));
}

#[test]
fn test_zero_intake_rejected() {
    let (_, stderr, code) = run_cli(&["reminder", "intake", "0"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_unknown_intake_source_rejected() {
    let (_, stderr, code) = run_cli(&["reminder", "intake", "250", "--source", "bucket"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("unknown intake source"));
}

#[test]
fn test_pause_out_of_range_rejected() {
    for minutes in ["9223372036854775807", "262800000000"] {
        let (_, stderr, code) = run_cli(&["reminder", "pause", minutes]);
        assert_ne!(code, 0, "pause {minutes} accepted");
        assert!(stderr.contains("error:"));
    }
}

#[test]
fn test_stats_today_is_json() {
    let (stdout, stderr, code) = run_cli(&["stats", "today", "--date", "2000-01-01"]);
    assert_eq!(code, 0, "stats today failed: {stderr}");
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["total_intake_ml"], 0);
    assert_eq!(parsed["date"], "2000-01-01");
}

#[test]
fn test_config_get_unknown_key_fails() {
    let (_, stderr, code) = run_cli(&["config", "get", "reminders.nope"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("unknown key"));
}

#[test]
fn test_config_list_shows_sections() {
    let (stdout, _, code) = run_cli(&["config", "list"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("reminders.base_interval_minutes = "));
    assert!(stdout.contains("work_hours.start = "));
}

#[test]
fn test_config_set_rejects_out_of_range() {
    let (_, _, code) = run_cli(&["config", "set", "reminders.base_interval_minutes", "5"]);
    assert_ne!(code, 0);
}

#[test]
fn test_completions_bash() {
    let (stdout, _, code) = run_cli(&["completions", "bash"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("aquapulse-cli"));
}
