// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Setup command tests: init, reset, completion.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn tally(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("tally");
    cmd.env("TALLY_DATA_DIR", dir.path())
        .env_remove("TALLY_REMOTE_URL")
        .env_remove("RUST_LOG");
    cmd
}

// =============================================================================
// init
// =============================================================================

#[test]
fn init_writes_config() {
    let temp = TempDir::new().unwrap();

    tally(&temp)
        .args(["init", "--remote-url", "https://budget.example.com/api"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized tally in"))
        .stdout(predicate::str::contains("Remote: https://budget.example.com/api"));

    let config = std::fs::read_to_string(temp.path().join("config.toml")).unwrap();
    assert!(config.contains("base_url = \"https://budget.example.com/api\""));
}

#[test]
fn init_twice_fails_without_force() {
    let temp = TempDir::new().unwrap();
    tally(&temp).arg("init").assert().success();

    tally(&temp)
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already initialized"));

    tally(&temp).args(["init", "--force"]).assert().success();
}

#[test]
fn init_rejects_non_http_remote() {
    let temp = TempDir::new().unwrap();
    tally(&temp)
        .args(["init", "--remote-url", "ftp://example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must start with http://"));
}

// =============================================================================
// reset
// =============================================================================

#[test]
fn reset_requires_yes() {
    let temp = TempDir::new().unwrap();
    tally(&temp)
        .arg("reset")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));
}

#[test]
fn reset_moves_unreadable_queue_aside() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("queue.jsonl"), "garbage\n").unwrap();

    tally(&temp)
        .args(["add", "checking", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("queue is unreadable"));

    tally(&temp)
        .args(["reset", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Moved unreadable queue to"));

    let aside: Vec<_> = std::fs::read_dir(temp.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().contains(".corrupt-"))
        .collect();
    assert_eq!(aside.len(), 1);

    tally(&temp).args(["add", "checking", "5"]).assert().success();
}

#[test]
fn reset_leaves_readable_queue_alone() {
    let temp = TempDir::new().unwrap();
    tally(&temp).args(["add", "checking", "5"]).assert().success();

    tally(&temp)
        .args(["reset", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to reset"));

    tally(&temp)
        .args(["list", "-o", "ids"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// =============================================================================
// completion
// =============================================================================

#[yare::parameterized(
    bash = { "bash" },
    zsh = { "zsh" },
    fish = { "fish" },
)]
fn completion_mentions_commands(shell: &str) {
    let temp = TempDir::new().unwrap();
    tally(&temp)
        .args(["completion", shell])
        .assert()
        .success()
        .stdout(predicate::str::contains("sync"))
        .stdout(predicate::str::contains("discard"));
}

#[test]
fn completion_invalid_shell_fails() {
    let temp = TempDir::new().unwrap();
    tally(&temp).args(["completion", "tcsh"]).assert().failure();
}
