use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

/// Nothing listens on the discard port, so requests fail fast.
const DEAD_SERVER: &str = "http://127.0.0.1:9/v1";

const CONFIG_VARS: &[&str] = &[
    "ENVIRONMENT",
    "SERVER",
    "AUTHORIZATION",
    "BUCKET",
    "COLLECTION",
    "BATCH_SIZE",
    "GIT_TOKEN",
    "SOURCE_REPO",
    "SOURCE_BRANCH",
    "DRY_RUN",
    "REQUEST_TIMEOUT_SECONDS",
    "CLONE_TIMEOUT_SECONDS",
    "REVIEW_MESSAGE",
    "SELF_APPROVE",
];

fn remsync_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("remsync"));
    for var in CONFIG_VARS {
        cmd.env_remove(var);
    }
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env("SERVER", DEAD_SERVER)
        .env("REQUEST_TIMEOUT_SECONDS", "2")
        .env("RUST_LOG", "warn");
    cmd
}

fn write_prompt(root: &Path) {
    let dir = root.join("prompts/chat/v1");
    fs::create_dir_all(&dir).expect("create prompt dir");
    fs::write(
        dir.join("model.json"),
        r#"{"feature": "chat", "model": "m-1", "parameters": {}}"#,
    )
    .expect("write json");
    fs::write(dir.join("model.md"), "Be brief.\n").expect("write md");
}

#[test]
fn help_lists_commands() {
    let home = TempDir::new().expect("home");
    remsync_cmd(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("sync").and(contains("diff")).and(contains("whoami")));
}

#[test]
fn whoami_reports_unreachable_server() {
    let home = TempDir::new().expect("home");
    remsync_cmd(home.path())
        .arg("whoami")
        .assert()
        .failure()
        .stderr(contains("credential check failed against http://127.0.0.1:9/v1"));
}

#[test]
fn sync_stops_before_writing_when_credentials_fail() {
    let home = TempDir::new().expect("home");
    let checkout = TempDir::new().expect("checkout");
    write_prompt(checkout.path());

    remsync_cmd(home.path())
        .args(["sync", "--source-dir"])
        .arg(checkout.path())
        .assert()
        .failure()
        .stderr(contains("credential check failed"));
}

#[test]
fn zero_batch_size_from_environment_is_rejected() {
    let home = TempDir::new().expect("home");
    remsync_cmd(home.path())
        .env("BATCH_SIZE", "0")
        .arg("sync")
        .assert()
        .failure()
        .stderr(contains("invalid batch size 0"));
}

#[test]
fn zero_batch_size_flag_is_rejected() {
    let home = TempDir::new().expect("home");
    remsync_cmd(home.path())
        .args(["sync", "--batch-size", "0"])
        .assert()
        .failure()
        .stderr(contains("--batch-size").and(contains("credential check").not()));
}

#[test]
fn unknown_environment_is_rejected() {
    let home = TempDir::new().expect("home");
    remsync_cmd(home.path())
        .env("ENVIRONMENT", "qa")
        .arg("whoami")
        .assert()
        .failure()
        .stderr(contains("unknown environment 'qa'"));
}

#[test]
fn config_file_with_unknown_key_is_rejected() {
    let home = TempDir::new().expect("home");
    let config = home.path().join("custom.yaml");
    fs::write(&config, "bukket: oops\n").expect("write config");

    remsync_cmd(home.path())
        .arg("--config")
        .arg(&config)
        .arg("whoami")
        .assert()
        .failure()
        .stderr(contains("failed to parse config").and(contains("custom.yaml")));
}

#[test]
fn diff_reports_missing_prompts_dir() {
    let home = TempDir::new().expect("home");
    let checkout = TempDir::new().expect("checkout");

    remsync_cmd(home.path())
        .args(["diff", "--source-dir"])
        .arg(checkout.path())
        .assert()
        .failure()
        .stderr(contains("prompts directory not found"));
}

#[test]
fn diff_reports_unreachable_destination() {
    let home = TempDir::new().expect("home");
    let checkout = TempDir::new().expect("checkout");
    write_prompt(checkout.path());

    remsync_cmd(home.path())
        .args(["diff", "--source-dir"])
        .arg(checkout.path())
        .assert()
        .failure()
        .stderr(contains("failed to read /buckets/main-workspace/collections/ai-window-prompts/records"));
}
