//! Smoke tests -- verify the binary runs and key subcommands work.

use assert_cmd::Command;
use predicates::prelude::*;

fn machinewatch() -> Command {
    let mut cmd = Command::cargo_bin("machinewatch").unwrap();
    // keep the host's config out of the picture
    cmd.env_remove("MACHINEWATCH_CONFIG").env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_help() {
    machinewatch()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicates::str::contains("Simulated machine-health monitor"));
}

#[test]
fn test_cli_version() {
    machinewatch()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicates::str::contains("machinewatch"));
}

#[test]
fn test_serve_subcommand_exists() {
    machinewatch().args(["serve", "--help"]).assert().success();
}

#[test]
fn test_simulate_table_output() {
    machinewatch()
        .args(["simulate", "--ticks", "5", "--seed", "7"])
        .assert()
        .success()
        .stdout(predicates::str::contains("Status"))
        .stdout(predicates::str::contains("    5 |"));
}

#[test]
fn test_simulate_json_lines() {
    let output = machinewatch()
        .args(["simulate", "--ticks", "3", "--seed", "1", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    for (i, line) in lines.iter().enumerate() {
        let v: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(v["sequence"], i as u64 + 1);
        let p = v["risk"]["probability"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&p));
    }
}

#[test]
fn test_simulate_is_reproducible_with_seed() {
    let run = || {
        machinewatch()
            .args(["simulate", "--ticks", "20", "--seed", "42", "--json"])
            .output()
            .unwrap()
            .stdout
    };
    let strip = |out: Vec<u8>| -> Vec<serde_json::Value> {
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| {
                let v: serde_json::Value = serde_json::from_str(l).unwrap();
                serde_json::json!({ "reading": v["reading"], "risk": v["risk"] })
            })
            .collect()
    };
    assert_eq!(strip(run()), strip(run()));
}

#[test]
fn test_config_show_prints_toml() {
    machinewatch()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicates::str::contains("[scheduler]"))
        .stdout(predicates::str::contains("tick_interval_ms = 4000"));
}

#[test]
fn test_config_check_accepts_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("machinewatch.toml");
    std::fs::write(&path, "[scheduler]\ntick_interval_ms = 3500\n").unwrap();

    machinewatch()
        .arg("--config")
        .arg(&path)
        .args(["config", "check"])
        .assert()
        .success()
        .stdout(predicates::str::contains("Configuration OK"));
}

#[test]
fn test_config_check_rejects_inverted_thresholds() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(
        &path,
        "[risk]\nwarning_threshold = 0.8\ncritical_threshold = 0.3\n",
    )
    .unwrap();

    machinewatch()
        .arg("--config")
        .arg(&path)
        .args(["config", "check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid monitor configuration"));
}

#[test]
fn test_broken_env_config_logs_fallback_warning() {
    machinewatch()
        .env("MACHINEWATCH_CONFIG", "/nonexistent/machinewatch.toml")
        .args(["config", "check"])
        .assert()
        .success()
        .stdout(predicates::str::contains("Configuration OK"))
        .stderr(predicate::str::contains(
            "MACHINEWATCH_CONFIG set but file could not be loaded",
        ));
}

#[test]
fn test_config_check_rejects_infinite_jitter() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("inf.toml");
    std::fs::write(&path, "[risk]\njitter = inf\n").unwrap();

    machinewatch()
        .arg("--config")
        .arg(&path)
        .args(["config", "check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("risk.jitter must be a finite number"));
}

#[test]
fn test_config_check_accepts_partial_rule() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("partial.toml");
    std::fs::write(&path, "[risk.torque_high]\nthreshold = 50.0\n").unwrap();

    machinewatch()
        .arg("--config")
        .arg(&path)
        .args(["config", "check"])
        .assert()
        .success();
}
