//! Integration tests for the vch-debug command line surface.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;

/// Binary with a clean environment: no colors, no config file, no target
/// variables inherited from the developer's shell.
fn vch_debug() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("vch-debug"));
    cmd.env("NO_COLOR", "1")
        .env("VCH_DEBUG_CONFIG", "/nonexistent/vch-debug/config.yaml")
        .env_remove("VCH_TARGET")
        .env_remove("VCH_USER")
        .env_remove("VCH_PASSWORD")
        .env_remove("VCH_THUMBPRINT")
        .env_remove("VCH_DEBUG_LOG");
    cmd
}

fn json_stdout(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.output().expect("run");
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

// --- Help and version tests ---

#[test]
fn test_cli_no_args_shows_help() {
    // clap with arg_required_else_help shows help on stderr and exits 2
    vch_debug().assert().code(2).stderr(predicate::str::contains(
        "Put a deployed Virtual Container Host appliance into a debuggable state",
    ));
}

#[test]
fn test_cli_help_flag_lists_commands() {
    vch_debug()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("debug"))
        .stdout(predicate::str::contains("version"));
}

#[test]
fn test_debug_help_lists_flags() {
    vch_debug()
        .args(["debug", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--compute-resource"))
        .stdout(predicate::str::contains("--authorized-key"))
        .stdout(predicate::str::contains("--rootpw"))
        .stdout(predicate::str::contains("--enable-ssh"))
        .stdout(predicate::str::contains("--timeout"));
}

#[test]
fn test_version_command_shows_short_version() {
    vch_debug()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with(format!(
            "vch-debug v{}-",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn test_version_command_json_outputs_valid_json() {
    let value = json_stdout(vch_debug().args(["version", "--json"]));
    assert_eq!(value["release"], env!("CARGO_PKG_VERSION"));
    assert!(
        value["version"]
            .as_str()
            .expect("version string")
            .starts_with('v')
    );
}

// --- NO_COLOR handling ---

#[test]
fn test_no_color_accepts_any_non_empty_value() {
    for value in ["1", "yes", "true"] {
        vch_debug()
            .env("NO_COLOR", value)
            .arg("version")
            .assert()
            .success()
            .stdout(predicate::str::contains("\x1b[").not());
    }
}

#[test]
fn test_no_color_empty_or_falsey_still_runs() {
    for value in ["", "0", "false"] {
        vch_debug()
            .env("NO_COLOR", value)
            .arg("version")
            .assert()
            .success();
    }
}

#[test]
fn test_no_color_flag_combines_with_env() {
    vch_debug()
        .env("NO_COLOR", "1")
        .args(["--no-color", "version"])
        .assert()
        .success();
}

// --- Input errors (no remote call) ---

#[test]
fn test_debug_without_selector_fails() {
    vch_debug()
        .args(["debug", "--target", "vc.example.com", "--user", "u", "--password", "p"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error: invalid arguments"))
        .stderr(predicate::str::contains("no target appliance selected"));
}

#[test]
fn test_debug_without_target_fails() {
    vch_debug()
        .args(["debug", "--id", "vm-42"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("missing target"));
}

#[test]
fn test_debug_half_compute_path_fails() {
    vch_debug()
        .args(["debug", "--compute-resource", "/dc1/host/cluster1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--name is also required"));
}

#[test]
fn test_debug_missing_key_file_fails() {
    vch_debug()
        .args([
            "debug",
            "--target",
            "vc.example.com",
            "--user",
            "u",
            "--password",
            "p",
            "--id",
            "vm-42",
            "--authorized-key",
            "/nonexistent/id.pub",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unable to load public key"));
}

#[test]
fn test_debug_zero_timeout_fails() {
    vch_debug()
        .args([
            "debug",
            "--target",
            "vc.example.com",
            "--user",
            "u",
            "--password",
            "p",
            "--id",
            "vm-42",
            "--timeout",
            "0s",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("timeout must be greater than zero"));
}

#[test]
fn test_debug_json_error_carries_code() {
    let mut cmd = vch_debug();
    cmd.args(["debug", "--json", "--id", "vm-42"]);
    let value = json_stdout(&mut cmd);
    assert_eq!(value["error"], true);
    assert_eq!(value["code"], "input_error");
    assert!(value.get("diagnostics").is_none() || value["diagnostics"].is_null());
}

#[test]
fn test_password_never_echoed_on_input_error() {
    vch_debug()
        .args(["debug", "--target", "vc.example.com", "--user", "u", "--password", "hunter2"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("hunter2").not())
        .stderr(predicate::str::contains("hunter2").not());
}

#[test]
fn test_invalid_config_file_is_reported() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "log:\n  level: loud\n").expect("write config");

    vch_debug()
        .env("VCH_DEBUG_CONFIG", &path)
        .args(["debug", "--id", "vm-42"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error: invalid configuration"));
}
