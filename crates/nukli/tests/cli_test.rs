//! Integration tests for the `nukli` binary.
//!
//! These validate argument parsing, help output, configuration resolution,
//! and pre-network validation -- all without a live bridge.
#![allow(clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a command for the `nukli` binary with env isolation.
///
/// Clears all `NB_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn nukli_cmd() -> Command {
    let mut cmd = Command::cargo_bin("nukli").unwrap();
    cmd.env("HOME", "/tmp/nukli-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/nukli-cli-test-nonexistent")
        .env_remove("NB_PROFILE")
        .env_remove("NB_HOST")
        .env_remove("NB_TOKEN")
        .env_remove("NB_TIMEOUT")
        .env_remove("NB_OUTPUT");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// A loopback port with nothing listening on it.
fn dead_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = nukli_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    nukli_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("Nuki bridge")
            .and(predicate::str::contains("discover"))
            .and(predicate::str::contains("lock-action"))
            .and(predicate::str::contains("eventlog")),
    );
}

#[test]
fn test_version_flag() {
    nukli_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("nukli"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    nukli_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Pre-network validation ──────────────────────────────────────────

#[test]
fn test_unknown_encryption_value_is_rejected() {
    let output = nukli_cmd()
        .args(["info", "-H", "127.0.0.1", "-T", "t", "-E", "rot13"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("invalid value"), "output:\n{text}");
}

#[test]
fn test_lock_action_zero_is_rejected_before_any_network_call() {
    // The host points nowhere routable; a fast usage failure proves the
    // request never left the process.
    let output = nukli_cmd()
        .args(["lock-action", "301", "0", "0", "-H", "203.0.113.1", "-T", "t"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("invalid value"), "output:\n{text}");
}

#[test]
fn test_lock_action_six_is_rejected_before_any_network_call() {
    let output = nukli_cmd()
        .args(["lock-action", "301", "0", "6", "-H", "203.0.113.1", "-T", "t"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("invalid value"), "output:\n{text}");
}

#[test]
fn test_device_type_one_was_never_assigned() {
    let output = nukli_cmd()
        .args(["lock-state", "301", "1", "-H", "203.0.113.1", "-T", "t"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("unknown device type"), "output:\n{text}");
}

#[test]
fn test_timeout_out_of_range_is_rejected() {
    let output = nukli_cmd()
        .args(["info", "-H", "127.0.0.1", "-T", "t", "-t", "0"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ── Configuration diagnostics ───────────────────────────────────────

#[test]
fn test_missing_host_names_the_env_var() {
    let output = nukli_cmd().args(["info", "-T", "t"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("NB_HOST"), "output:\n{text}");
}

#[test]
fn test_missing_token_points_at_the_auth_flow() {
    let output = nukli_cmd()
        .args(["info", "-H", "127.0.0.1"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("NB_TOKEN"), "output:\n{text}");
    assert!(text.contains("nukli auth"), "output:\n{text}");
}

// ── Config file profiles ────────────────────────────────────────────

#[test]
fn test_profile_supplies_host_and_token() {
    let config_home = tempfile::tempdir().unwrap();
    let config_dir = config_home.path().join("nukli");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.toml"),
        format!(
            "default_profile = \"home\"\n\n\
             [profiles.home]\n\
             host = \"127.0.0.1:{}\"\n\
             token = \"sekrit\"\n\
             encryption = \"none\"\n\
             timeout = 1\n",
            dead_port()
        ),
    )
    .unwrap();

    // Resolution succeeds (no missing-host/token usage error); the dead
    // port then fails as a connection error with exit code 7.
    let output = nukli_cmd()
        .env("XDG_CONFIG_HOME", config_home.path())
        .arg("info")
        .output()
        .unwrap();
    assert_eq!(
        output.status.code(),
        Some(7),
        "output:\n{}",
        combined_output(&output)
    );
}

#[test]
fn test_profile_with_bad_encryption_is_a_usage_error() {
    let config_home = tempfile::tempdir().unwrap();
    let config_dir = config_home.path().join("nukli");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.toml"),
        "[profiles.default]\nhost = \"127.0.0.1\"\ntoken = \"t\"\nencryption = \"rot13\"\n",
    )
    .unwrap();

    let output = nukli_cmd()
        .env("XDG_CONFIG_HOME", config_home.path())
        .arg("info")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("encryption"), "output:\n{text}");
}
