// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queue command tests: add, enqueue, list, status, discard.

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

fn add(dir: &TempDir, args: &[&str]) -> String {
    let output = tally(dir).arg("add").args(args).output().unwrap();
    assert!(
        output.status.success(),
        "add failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

fn list_json(dir: &TempDir) -> Vec<serde_json::Value> {
    let output = tally(dir).args(["list", "-o", "json"]).output().unwrap();
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
}

// =============================================================================
// add
// =============================================================================

#[test]
fn add_prints_mutation_id() {
    let temp = TempDir::new().unwrap();
    let id = add(&temp, &["checking", "12.50"]);
    assert!(id.starts_with("mut-"), "unexpected id: {}", id);
}

#[test]
fn add_works_without_init() {
    let temp = TempDir::new().unwrap();
    add(&temp, &["checking", "1"]);
    assert!(temp.path().join("queue.jsonl").exists());
}

#[test]
fn add_stores_normalized_transaction() {
    let temp = TempDir::new().unwrap();
    add(
        &temp,
        &[
            "card", "9.90", "-c", "subscriptions", "--currency", "usd", "--date", "2026-01-31",
        ],
    );

    let items = list_json(&temp);
    assert_eq!(items.len(), 1);
    let body = &items[0]["payload"]["body"];
    assert_eq!(items[0]["payload"]["kind"], "transaction.create");
    assert_eq!(body["account"], "card");
    assert_eq!(body["amount"], "9.9");
    assert_eq!(body["currency"], "USD");
    assert_eq!(body["date"], "2026-01-31");
    assert_eq!(body["category"], "subscriptions");
    assert_eq!(items[0]["status"], "pending");
}

#[yare::parameterized(
    zero_amount = { &["checking", "0"], "must be greater than zero" },
    bad_amount = { &["checking", "ten"], "not a decimal number" },
    bad_currency = { &["checking", "5", "--currency", "euro"], "invalid currency" },
    bad_date = { &["checking", "5", "--date", "31/01/2026"], "invalid date" },
    transfer_without_to = { &["checking", "5", "--kind", "transfer"], "cannot be empty" },
    to_without_transfer = { &["checking", "5", "--to", "savings"], "only valid for transfers" },
)]
fn add_rejects_invalid_input(args: &[&str], message: &str) {
    let temp = TempDir::new().unwrap();
    tally(&temp)
        .arg("add")
        .args(args)
        .assert()
        .failure()
        .stderr(predicate::str::contains(message));
    assert!(list_json(&temp).is_empty());
}

// =============================================================================
// enqueue
// =============================================================================

#[test]
fn enqueue_arbitrary_kind() {
    let temp = TempDir::new().unwrap();
    tally(&temp)
        .args(["enqueue", "budget.update", r#"{"category":"rent","limit":"900"}"#])
        .assert()
        .success();

    let items = list_json(&temp);
    assert_eq!(items[0]["payload"]["kind"], "budget.update");
    assert_eq!(items[0]["payload"]["body"]["limit"], "900");
}

#[test]
fn enqueue_rejects_bad_kind() {
    let temp = TempDir::new().unwrap();
    tally(&temp)
        .args(["enqueue", "Budget Update", "{}"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid mutation kind"));
}

// =============================================================================
// list
// =============================================================================

#[test]
fn list_keeps_insertion_order() {
    let temp = TempDir::new().unwrap();
    let first = add(&temp, &["checking", "1"]);
    let second = add(&temp, &["checking", "2"]);
    let third = add(&temp, &["checking", "3"]);

    tally(&temp)
        .args(["list", "-o", "ids"])
        .assert()
        .success()
        .stdout(format!("{}\n{}\n{}\n", first, second, third));
}

#[test]
fn list_empty_queue() {
    let temp = TempDir::new().unwrap();
    tally(&temp).arg("list").assert().success().stdout("");
}

#[test]
fn list_text_shows_status_and_kind() {
    let temp = TempDir::new().unwrap();
    let id = add(&temp, &["checking", "1"]);
    tally(&temp)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::starts_with(format!("{}  pending  transaction.create", id)));
}

// =============================================================================
// status
// =============================================================================

#[test]
fn status_reports_counts() {
    let temp = TempDir::new().unwrap();
    add(&temp, &["checking", "1"]);
    add(&temp, &["checking", "2"]);

    tally(&temp)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Pending:  2 (0 failed, 0 stalled)"))
        .stdout(predicate::str::contains("Watcher:  not running"));
}

#[test]
fn status_json_on_unreadable_queue_reports_error() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("queue.jsonl"), "{oops\n").unwrap();

    let output = tally(&temp).args(["status", "-o", "json"]).output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["pending_count"], 0);
    assert!(json["sync_error"].is_string());
}

#[test]
fn status_uses_remote_from_env() {
    let temp = TempDir::new().unwrap();
    tally(&temp)
        .env("TALLY_REMOTE_URL", "http://10.0.0.5:9000/api")
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Remote:   http://10.0.0.5:9000/api"));
}

// =============================================================================
// discard
// =============================================================================

#[test]
fn discard_requires_yes() {
    let temp = TempDir::new().unwrap();
    let id = add(&temp, &["checking", "1"]);

    tally(&temp)
        .args(["discard", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be undone"));
    assert_eq!(list_json(&temp).len(), 1);
}

#[test]
fn discard_removes_record() {
    let temp = TempDir::new().unwrap();
    let first = add(&temp, &["checking", "1"]);
    let second = add(&temp, &["checking", "2"]);

    tally(&temp)
        .args(["discard", &first, "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Discarded {}", first)));

    tally(&temp)
        .args(["list", "-o", "ids"])
        .assert()
        .success()
        .stdout(format!("{}\n", second));
}

#[test]
fn discard_unknown_id_fails() {
    let temp = TempDir::new().unwrap();
    tally(&temp)
        .args(["discard", "mut-000000000000", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("mutation not found"));
}
