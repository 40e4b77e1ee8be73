//! E2E tests for `critlink build`.
//!
//! Each test runs the binary in an isolated temp directory laid out like a
//! project: configuration tree and extracted text at their default paths.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

const TREE: &str = r#"{
  "ems_full_configuration": [
    { "sections": [ { "standards": [
      { "criteria": [ { "id": "1.2.1.2" }, { "id": "1.2.3.4" } ] },
      { "criteria": [ { "id": "1.2.5.1" } ] }
    ] } ] },
    { "sections": [ { "standards": [ { "criteria": [ { "id": "9.9.9.9" } ] } ] } ] }
  ]
}"#;

const TEXT: &str = "\
--- Page 1 ---
1.2.1.2 The service maintains a current staffing plan
1.2.5.1
1.2.3.4 Vehicles are checked against the daily checklist
9.9.9.9
1.2.5.1 Staffing levels are reviewed against the plan
1.2.1.2
";

fn critlink(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("critlink"));
    cmd.current_dir(dir);
    cmd.env("CRITLINK_LOG", "error");
    cmd.env_remove("FORMAT");
    cmd
}

fn project() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    fs::create_dir_all(dir.path().join("src/assets")).expect("assets dir");
    fs::create_dir_all(dir.path().join("Matrix")).expect("matrix dir");
    fs::write(dir.path().join("src/assets/ems_config.json"), TREE).expect("tree");
    fs::write(dir.path().join("Matrix/extracted_text.txt"), TEXT).expect("text");
    dir
}

fn build_json(dir: &Path, extra: &[&str]) -> Value {
    let output = critlink(dir)
        .arg("build")
        .args(extra)
        .arg("--json")
        .output()
        .expect("build should not crash");
    assert!(
        output.status.success(),
        "build failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("build --json should produce valid JSON")
}

fn links_of(artifact: &Value, code: &str) -> Vec<String> {
    artifact
        .as_array()
        .expect("artifact is an array")
        .iter()
        .find(|r| r["criteria"] == code)
        .and_then(|r| r["linked_criteria"].as_array())
        .map(|links| {
            links
                .iter()
                .filter_map(|l| l.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn build_writes_broken_and_tagged_artifact() {
    let dir = project();
    let report = build_json(dir.path(), &[]);
    assert_eq!(report["status"], "written");
    assert_eq!(report["records"], 4);

    let out = dir.path().join("src/assets/ems_links.json");
    let text = fs::read_to_string(&out).expect("artifact written");
    assert!(text.ends_with("]\n"));
    assert!(text.contains("\n    {\n        \"criteria\""), "four-space indent");

    let artifact: Value = serde_json::from_str(&text).expect("artifact json");
    assert_eq!(links_of(&artifact, "1.2.1.2"), vec!["1.2.5.1"]);
    assert_eq!(links_of(&artifact, "1.2.5.1"), vec!["1.2.1.2-root(1.2.1.2)"]);
    assert_eq!(links_of(&artifact, "1.2.3.4"), vec!["9.9.9.9"]);
}

#[test]
fn second_build_is_unchanged() {
    let dir = project();
    build_json(dir.path(), &[]);
    let report = build_json(dir.path(), &[]);
    assert_eq!(report["status"], "unchanged");
}

#[test]
fn dry_run_writes_nothing() {
    let dir = project();
    let report = build_json(dir.path(), &["--dry-run"]);
    assert_eq!(report["status"], "would_write");
    assert!(!dir.path().join("src/assets/ems_links.json").exists());
}

#[test]
fn out_flag_overrides_config() {
    let dir = project();
    build_json(dir.path(), &["--out", "custom/links.json"]);
    assert!(dir.path().join("custom/links.json").exists());
}

#[test]
fn config_file_paths_are_used() {
    let dir = project();
    fs::rename(
        dir.path().join("Matrix/extracted_text.txt"),
        dir.path().join("Matrix/other.txt"),
    )
    .expect("move text");
    fs::write(
        dir.path().join("critlink.toml"),
        "[extract]\ntext = \"Matrix/other.txt\"\nout = \"build/links.json\"\n",
    )
    .expect("config");

    build_json(dir.path(), &[]);
    assert!(dir.path().join("build/links.json").exists());
}

#[test]
fn missing_config_tree_reports_error_code() {
    let dir = project();
    fs::remove_file(dir.path().join("src/assets/ems_config.json")).expect("remove tree");

    critlink(dir.path())
        .args(["build", "--format", "text"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1002"));
}

#[test]
fn missing_text_reports_error_code_as_json() {
    let dir = project();
    fs::remove_file(dir.path().join("Matrix/extracted_text.txt")).expect("remove text");

    let output = critlink(dir.path())
        .args(["build", "--json"])
        .output()
        .expect("run");
    assert!(!output.status.success());
    let err: Value = serde_json::from_slice(&output.stderr).expect("json error");
    assert_eq!(err["error"]["error_code"], "E1003");
}

#[test]
fn invalid_project_config_is_a_parse_error() {
    let dir = project();
    fs::write(dir.path().join("critlink.toml"), "[extract\n").expect("config");

    critlink(dir.path())
        .args(["build", "--format", "text"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1001"));
}

#[test]
fn completions_are_generated() {
    let dir = TempDir::new().expect("tempdir");
    critlink(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("critlink"));
}
