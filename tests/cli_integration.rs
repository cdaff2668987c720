//! Integration tests for the gitpane binary.
//!
//! These tests run the built executable against real repositories and
//! check its stdout, stderr and exit status.

mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use common::TestRepo;

/// The binary with an isolated home so no user config is picked up.
fn gitpane(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("gitpane").unwrap();
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path())
        .env_remove("GITPANE_CONFIG")
        .env_remove("GITPANE_LOG");
    cmd
}

#[test]
fn version_flag_works() {
    let home = TempDir::new().unwrap();
    gitpane(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("gitpane"));
}

#[test]
fn help_lists_commands() {
    let home = TempDir::new().unwrap();
    gitpane(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("branches"));
}

#[test]
fn branches_marks_head() {
    let repo = TestRepo::new();
    repo.git(&["branch", "topic"]);
    let home = TempDir::new().unwrap();

    gitpane(&home)
        .args(["branches", "--cwd"])
        .arg(repo.path())
        .assert()
        .success()
        .stdout("* main\n  topic\n");
}

#[test]
fn status_json_lists_changes() {
    let repo = TestRepo::new();
    repo.write("README.md", "edited\n");
    let home = TempDir::new().unwrap();

    let output = gitpane(&home)
        .current_dir(repo.path())
        .args(["status", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        value,
        serde_json::json!([{"path": "README.md", "status": "modified"}])
    );
}

#[test]
fn log_shows_summaries() {
    let repo = TestRepo::new();
    repo.commit_file("a.txt", "a\n", "Add a");
    let home = TempDir::new().unwrap();

    gitpane(&home)
        .current_dir(repo.path())
        .args(["log", "-n", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Add a"))
        .stdout(predicate::str::contains("Initial commit").not());
}

#[test]
fn diff_prints_unified_text() {
    let repo = TestRepo::new();
    repo.write("README.md", "# Test Repo\nmore\n");
    let home = TempDir::new().unwrap();

    gitpane(&home)
        .current_dir(repo.path())
        .args(["diff", "README.md"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("diff --git a/README.md b/README.md\n"))
        .stdout(predicate::str::contains("+more\n"));
}

#[test]
fn outside_a_repository_fails() {
    let dir = TempDir::new().unwrap();
    let home = TempDir::new().unwrap();

    gitpane(&home)
        .current_dir(dir.path())
        .arg("branches")
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("error:"));
}

#[test]
fn exec_reports_success_and_failure() {
    let repo = TestRepo::new();
    let home = TempDir::new().unwrap();
    let dir = repo.path().to_string_lossy().into_owned();

    let ok = serde_json::json!({"command": "get_head", "directory": dir}).to_string();
    gitpane(&home)
        .args(["exec", &ok])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"ok\": true"));

    let bad = serde_json::json!({
        "command": "delete_branch",
        "directory": dir,
        "branch_name": "main",
    })
    .to_string();
    gitpane(&home)
        .args(["exec", &bad])
        .assert()
        .failure()
        .stdout(predicate::str::contains("cannot_delete_head"));
}

#[test]
fn exec_reads_request_from_stdin() {
    let repo = TestRepo::new();
    let home = TempDir::new().unwrap();
    let request = serde_json::json!({"command": "get_branch_list", "directory": repo.path()});

    gitpane(&home)
        .args(["exec", "-"])
        .write_stdin(request.to_string())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"main\""));
}

#[test]
fn serve_answers_every_line() {
    let repo = TestRepo::new();
    let home = TempDir::new().unwrap();
    let dir = repo.path().to_string_lossy().into_owned();
    let input = [
        serde_json::json!({"command": "get_head", "directory": dir, "request_id": "a"}),
        serde_json::json!({"command": "get_branch_list", "directory": dir, "request_id": "b"}),
        serde_json::json!({"command": "nonsense", "request_id": "c"}),
    ]
    .iter()
    .map(|v| format!("{v}\n"))
    .collect::<String>();

    let output = gitpane(&home)
        .arg("serve")
        .write_stdin(input)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let mut responses: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    responses.sort_by_key(|r| r["request_id"].as_str().unwrap_or_default().to_string());

    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0]["data"], serde_json::json!({"kind": "branch", "name": "main"}));
    assert_eq!(responses[1]["ok"], true);
    assert_eq!(responses[2]["error"]["kind"], "invalid_request");
}

#[test]
fn missing_explicit_config_is_an_error() {
    let repo = TestRepo::new();
    let home = TempDir::new().unwrap();

    gitpane(&home)
        .current_dir(repo.path())
        .args(["status", "--config"])
        .arg(home.path().join("absent.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load configuration"));
}

#[test]
fn config_file_is_validated() {
    let repo = TestRepo::new();
    let home = TempDir::new().unwrap();
    let config = home.path().join("gitpane.toml");
    std::fs::write(&config, "[diff]\nrename_threshold = 0\n").unwrap();

    gitpane(&home)
        .current_dir(repo.path())
        .args(["status", "--config"])
        .arg(&config)
        .assert()
        .failure();
}

#[test]
fn completion_generates_script() {
    let home = TempDir::new().unwrap();
    gitpane(&home)
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gitpane"));
}
