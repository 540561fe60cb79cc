use assert_cmd::prelude::*;
use predicates::str::{contains, is_empty};
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn expected_values(count: u64) -> Vec<u64> {
    let mut values: Vec<u64> = (1..=count).map(|i| i * i + (i + 1) * (i + 1)).collect();
    values.sort();
    values
}

fn parse_values(stdout: &[u8]) -> Vec<u64> {
    let mut values: Vec<u64> = String::from_utf8_lossy(stdout)
        .lines()
        .map(|l| l.trim().parse().expect("non-numeric output line"))
        .collect();
    values.sort();
    values
}

// `fnpool-demo -V` should print the version
#[test]
fn demo_cli_version() {
    Command::cargo_bin("fnpool-demo")
        .unwrap()
        .args(&["-V"])
        .assert()
        .success()
        .stdout(contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn demo_prints_every_result() {
    let output = Command::cargo_bin("fnpool-demo")
        .unwrap()
        .args(&["--delay-ms", "0", "--workers", "4"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(parse_values(&output.stdout), expected_values(20));
}

#[test]
fn demo_honours_count_and_single_worker() {
    let output = Command::cargo_bin("fnpool-demo")
        .unwrap()
        .args(&["--delay-ms", "0", "-w", "1", "--count", "5"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(parse_values(&output.stdout), expected_values(5));
}

#[test]
fn demo_json_output() {
    let output = Command::cargo_bin("fnpool-demo")
        .unwrap()
        .args(&["--delay-ms", "0", "--count", "3", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let mut records: Vec<serde_json::Value> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    records.sort_by_key(|r| r["x"].as_u64());
    assert_eq!(records.len(), 3);
    assert_eq!(records[0], serde_json::json!({ "x": 1, "y": 2, "value": 5 }));
    assert_eq!(records[2], serde_json::json!({ "x": 3, "y": 4, "value": 25 }));
}

#[test]
fn demo_zero_count_prints_nothing() {
    Command::cargo_bin("fnpool-demo")
        .unwrap()
        .args(&["--delay-ms", "0", "--count", "0"])
        .assert()
        .success()
        .stdout(is_empty());
}

#[test]
fn demo_rejects_zero_workers() {
    Command::cargo_bin("fnpool-demo")
        .unwrap()
        .args(&["--delay-ms", "0", "--workers", "0"])
        .assert()
        .failure()
        .stdout(is_empty())
        .stderr(contains("worker count must be at least 1"));
}

#[test]
fn demo_invalid_arguments() {
    Command::cargo_bin("fnpool-demo")
        .unwrap()
        .args(&["--workers", "many"])
        .assert()
        .failure();

    Command::cargo_bin("fnpool-demo")
        .unwrap()
        .args(&["--unknown-flag"])
        .assert()
        .failure();

    Command::cargo_bin("fnpool-demo")
        .unwrap()
        .args(&["extra"])
        .assert()
        .failure();

    Command::cargo_bin("fnpool-demo")
        .unwrap()
        .args(&["--format", "xml"])
        .assert()
        .failure();
}

#[test]
fn demo_reads_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("pool.json");
    fs::write(&path, r#"{ "workers": 2, "thread_name": "demo" }"#).unwrap();

    Command::cargo_bin("fnpool-demo")
        .unwrap()
        .args(&["--delay-ms", "0", "--count", "1", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout("5\n");
}

#[test]
fn demo_rejects_bad_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("pool.json");
    fs::write(&path, r#"{ "workers": 0 }"#).unwrap();

    Command::cargo_bin("fnpool-demo")
        .unwrap()
        .args(&["--delay-ms", "0", "--config"])
        .arg(&path)
        .assert()
        .failure();

    Command::cargo_bin("fnpool-demo")
        .unwrap()
        .args(&["--delay-ms", "0", "--config"])
        .arg(temp_dir.path().join("missing.json"))
        .assert()
        .failure();
}
