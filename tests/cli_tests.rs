//! Integration tests for the crewline CLI
//!
//! These tests run the actual binary against crew files on disk. Runs use
//! the mock provider and an isolated HOME so no user config leaks in.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Get the binary to test
fn crewline_cmd(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("crewline").unwrap();
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env_remove("OPENAI_API_KEY")
        .env_remove("CREWLINE_PROVIDER")
        .env_remove("CREWLINE_MODEL")
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

fn video_crew() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("crews/video-script.crew.yaml")
}

fn write_crew(dir: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, yaml).unwrap();
    path
}

const FORWARD_DEP: &str = r#"
schema: crewline/crew@0.1
agents:
  - id: a
    role: Writer
    goal: Write
tasks:
  - id: t1
    agent: a
    description: first
  - id: t2
    agent: a
    description: second
    context: [t3]
  - id: t3
    agent: a
    description: third
"#;

const NEEDS_TOPIC: &str = r#"
schema: crewline/crew@0.1
agents:
  - id: a
    role: Writer
    goal: Write about {topic}
tasks:
  - id: t1
    agent: a
    description: Draft on {topic}
"#;

// ============================================================================
// Help / capabilities
// ============================================================================

#[test]
fn test_help_flag() {
    let home = TempDir::new().unwrap();
    crewline_cmd(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sequential crew pipeline runner"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("capabilities"));
}

#[test]
fn test_capabilities_lists_web_search() {
    let home = TempDir::new().unwrap();
    crewline_cmd(&home)
        .arg("capabilities")
        .assert()
        .success()
        .stdout(predicate::str::contains("web_search"));
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_validate_shipped_crew() {
    let home = TempDir::new().unwrap();
    crewline_cmd(&home)
        .arg("validate")
        .arg(video_crew())
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"))
        .stdout(predicate::str::contains("roteiro → thumbnail → revisao"))
        .stdout(predicate::str::contains("Parameters: query"));
}

#[test]
fn test_validate_forward_dependency_fails() {
    let home = TempDir::new().unwrap();
    let file = write_crew(&home, "bad.crew.yaml", FORWARD_DEP);
    crewline_cmd(&home)
        .arg("validate")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("CREW-020"))
        .stderr(predicate::str::contains("Fix:"));
}

#[test]
fn test_validate_missing_file_fails() {
    let home = TempDir::new().unwrap();
    crewline_cmd(&home)
        .args(["validate", "does-not-exist.crew.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CREW-090"));
}

// ============================================================================
// Run
// ============================================================================

#[test]
fn test_run_with_mock_provider() {
    let home = TempDir::new().unwrap();
    crewline_cmd(&home)
        .arg("run")
        .arg(video_crew())
        .args(["--provider", "mock", "-i", "query=Indies de 2021"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Using provider: mock"))
        .stdout(predicate::str::contains("Output:"))
        .stdout(predicate::str::contains("Mock response"))
        .stdout(predicate::str::contains("3 tasks"));
}

#[test]
fn test_run_missing_parameter_fails() {
    let home = TempDir::new().unwrap();
    let file = write_crew(&home, "topic.crew.yaml", NEEDS_TOPIC);
    crewline_cmd(&home)
        .arg("run")
        .arg(&file)
        .args(["--provider", "mock"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CREW-030"))
        .stderr(predicate::str::contains("topic"));
}

#[test]
fn test_run_bad_input_syntax_fails() {
    let home = TempDir::new().unwrap();
    crewline_cmd(&home)
        .arg("run")
        .arg(video_crew())
        .args(["--provider", "mock", "-i", "no-equals-sign"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CREW-003"));
}

#[test]
fn test_run_prints_events() {
    let home = TempDir::new().unwrap();
    crewline_cmd(&home)
        .arg("run")
        .arg(video_crew())
        .args(["--provider", "mock", "--events"])
        .assert()
        .success()
        .stdout(predicate::str::contains("crew_started"))
        .stdout(predicate::str::contains("context_assembled"))
        .stdout(predicate::str::contains("crew_completed"));
}

#[test]
fn test_run_unknown_provider_fails() {
    let home = TempDir::new().unwrap();
    crewline_cmd(&home)
        .arg("run")
        .arg(video_crew())
        .args(["--provider", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CREW-050"));
}
