//! Basic CLI E2E tests.
//!
//! Tests run the built binary with ITDESK_HOME pointed at a temp dir, so no
//! backend or user config is touched.

use std::process::Command;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &tempfile::TempDir, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_itdesk"))
        .args(args)
        .env("ITDESK_HOME", home.path())
        .env_remove("RUST_LOG")
        .env_remove("ITDESK_BACKEND_URL")
        .env_remove("BACKEND_URL")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn home() -> tempfile::TempDir {
    tempfile::tempdir().unwrap()
}

#[test]
fn test_config_list_creates_defaults() {
    let home = home();
    let (stdout, _, code) = run_cli(&home, &["config", "list", "--json"]);
    assert_eq!(code, 0);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["backend"]["url"], "http://localhost:3001");
    assert_eq!(json["calendar"]["default_start_time"], "09:00");
    assert!(home.path().join("config.toml").exists());
}

#[test]
fn test_config_list_prints_dotted_keys() {
    let home = home();
    let (stdout, _, code) = run_cli(&home, &["config", "list"]);
    assert_eq!(code, 0);
    assert!(stdout.lines().any(|l| l == "backend.url = http://localhost:3001"));
    assert!(stdout.lines().any(|l| l == "session.action_gate_minutes = 10"));
}

#[test]
fn test_config_rejects_out_of_range_numbers() {
    let home = home();
    let (_, stderr, code) = run_cli(
        &home,
        &["config", "set", "session.action_gate_minutes", "200000000000"],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("1 to 1440 minutes"));

    let (_, _, code) = run_cli(&home, &["config", "set", "calendar.upcoming_days", "-3"]);
    assert_eq!(code, 1);

    let (stdout, _, _) = run_cli(&home, &["config", "get", "session.action_gate_minutes"]);
    assert_eq!(stdout.trim(), "10");
}

#[test]
fn test_config_set_then_get() {
    let home = home();
    let (_, _, code) = run_cli(&home, &["config", "set", "backend.timeout_secs", "10"]);
    assert_eq!(code, 0);
    let (stdout, _, code) = run_cli(&home, &["config", "get", "backend.timeout_secs"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "10");
}

#[test]
fn test_config_rejects_bad_values() {
    let home = home();
    let (_, stderr, code) = run_cli(
        &home,
        &["config", "set", "calendar.default_start_time", "25:00"],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("calendar.default_start_time"));

    let (_, _, code) = run_cli(&home, &["config", "get", "backend.nope"]);
    assert_eq!(code, 1);
}

#[test]
fn test_config_reset() {
    let home = home();
    run_cli(&home, &["config", "set", "calendar.upcoming_days", "30"]);
    let (_, _, code) = run_cli(&home, &["config", "reset"]);
    assert_eq!(code, 0);
    let (stdout, _, _) = run_cli(&home, &["config", "get", "calendar.upcoming_days"]);
    assert_eq!(stdout.trim(), "7");
}

#[test]
fn test_expand_weekly_without_end() {
    let home = home();
    let (stdout, _, code) = run_cli(
        &home,
        &[
            "events", "expand", "--title", "Backup", "--start", "2025-01-01", "--repeat",
            "weekly", "--interval", "2",
        ],
    );
    assert_eq!(code, 0);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.first().copied(), Some("2025-01-01 09:00 [Otro] Backup (Recurrente)"));
    assert_eq!(lines.last().copied(), Some("27 instance(s)"));
}

#[test]
fn test_expand_json_monthly_clamps() {
    let home = home();
    let (stdout, _, code) = run_cli(
        &home,
        &[
            "events", "expand", "--json", "--title", "Cierre", "--start",
            "2025-01-31T18:00", "--repeat", "monthly", "--until", "2025-04-30",
        ],
    );
    assert_eq!(code, 0);
    let json: Vec<serde_json::Value> = serde_json::from_str(&stdout).unwrap();
    let starts: Vec<&str> = json.iter().map(|e| e["start_date"].as_str().unwrap()).collect();
    assert_eq!(
        starts,
        vec![
            "2025-01-31T18:00:00",
            "2025-02-28T18:00:00",
            "2025-03-31T18:00:00",
            "2025-04-30T18:00:00",
        ]
    );
    assert!(json.iter().all(|e| e["is_recurring"] == false));
}

#[test]
fn test_expand_uses_configured_default_time() {
    let home = home();
    run_cli(&home, &["config", "set", "calendar.default_start_time", "07:30"]);
    let (stdout, _, code) = run_cli(
        &home,
        &["events", "expand", "--title", "Visita", "--start", "2025-05-02"],
    );
    assert_eq!(code, 0);
    assert!(stdout.starts_with("2025-05-02 07:30 [Otro] Visita\n"));
    assert!(stdout.contains("1 instance(s)"));
}

#[test]
fn test_expand_requires_title() {
    let home = home();
    let (_, stderr, code) = run_cli(&home, &["events", "expand", "--start", "2025-05-02"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Validation error"));
    assert!(stderr.contains("title"));
}

#[test]
fn test_invalid_event_type_is_usage_error() {
    let home = home();
    let (_, _, code) = run_cli(
        &home,
        &["events", "expand", "--title", "X", "--start", "2025-05-02", "--type", "party"],
    );
    assert_eq!(code, 2);
}
