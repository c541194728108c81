// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync command tests against a local HTTP stub.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread::JoinHandle;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Nothing listens on port 1, so connections are refused.
const DEAD_REMOTE: &str = "http://127.0.0.1:1/api";

fn tally(dir: &TempDir, remote: &str) -> Command {
    let mut cmd = cargo_bin_cmd!("tally");
    cmd.env("TALLY_DATA_DIR", dir.path())
        .env("TALLY_REMOTE_URL", remote)
        .env_remove("RUST_LOG");
    cmd
}

fn add(dir: &TempDir, amount: &str) -> String {
    let output = tally(dir, DEAD_REMOTE)
        .args(["add", "checking", amount])
        .output()
        .unwrap();
    assert!(output.status.success());
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

fn list_json(dir: &TempDir) -> Vec<serde_json::Value> {
    let output = tally(dir, DEAD_REMOTE)
        .args(["list", "-o", "json"])
        .output()
        .unwrap();
    serde_json::from_slice(&output.stdout).unwrap()
}

/// A captured request: request line, idempotency key, and body.
struct Captured {
    request_line: String,
    idempotency_key: Option<String>,
    body: String,
}

/// Serves one canned response per entry in `statuses`, then stops.
fn serve(statuses: Vec<u16>) -> (String, JoinHandle<Vec<Captured>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/api", listener.local_addr().unwrap());
    let handle = std::thread::spawn(move || {
        let mut captured = Vec::new();
        for status in statuses {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();

            let mut length = 0;
            let mut idempotency_key = None;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                let line = line.trim_end();
                if line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    match name.to_ascii_lowercase().as_str() {
                        "content-length" => length = value.trim().parse().unwrap(),
                        "idempotency-key" => idempotency_key = Some(value.trim().to_string()),
                        _ => {}
                    }
                }
            }
            let mut body = vec![0; length];
            reader.read_exact(&mut body).unwrap();

            let reply = if status < 300 { "{}" } else { "{\"error\":\"bad amount\"}" };
            let mut stream = stream;
            write!(
                stream,
                "HTTP/1.1 {} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                reply.len(),
                reply
            )
            .unwrap();
            captured.push(Captured {
                request_line: request_line.trim_end().to_string(),
                idempotency_key,
                body: String::from_utf8(body).unwrap(),
            });
        }
        captured
    });
    (url, handle)
}

#[test]
fn sync_empty_queue() {
    let temp = TempDir::new().unwrap();
    tally(&temp, DEAD_REMOTE)
        .arg("sync")
        .assert()
        .success()
        .stdout("Nothing to sync\n");
}

#[test]
fn sync_unreachable_keeps_records_and_counts_attempt() {
    let temp = TempDir::new().unwrap();
    add(&temp, "1");
    add(&temp, "2");

    tally(&temp, DEAD_REMOTE)
        .arg("sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("Remote unreachable; 2 mutation(s) left queued"));

    let items = list_json(&temp);
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["retry_count"], 1);
    assert!(items[0]["last_error"].is_string());
    assert_eq!(items[1]["retry_count"], 0);
}

#[test]
fn sync_replays_in_order_with_idempotency_keys() {
    let temp = TempDir::new().unwrap();
    let first = add(&temp, "1");
    let second = add(&temp, "2");
    let (url, server) = serve(vec![201, 201]);

    tally(&temp, &url)
        .arg("sync")
        .assert()
        .success()
        .stdout("Synced 2 of 2 mutation(s)\n");

    let captured = server.join().unwrap();
    assert_eq!(captured[0].request_line, "POST /api/transactions HTTP/1.1");
    assert_eq!(captured[0].idempotency_key.as_deref(), Some(first.as_str()));
    assert_eq!(captured[1].idempotency_key.as_deref(), Some(second.as_str()));
    assert!(captured[0].body.contains("\"amount\":\"1\""));
    assert!(list_json(&temp).is_empty());
}

#[test]
fn sync_rejection_keeps_record_and_continues() {
    let temp = TempDir::new().unwrap();
    let rejected = add(&temp, "1");
    add(&temp, "2");
    let (url, server) = serve(vec![422, 201]);

    let output = tally(&temp, &url)
        .args(["sync", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    server.join().unwrap();

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["attempted"], 2);
    assert_eq!(report["succeeded"], 1);
    assert_eq!(report["failed"], 1);
    assert_eq!(report["aborted"], false);
    assert_eq!(report["remaining"], 1);

    let items = list_json(&temp);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], rejected.as_str());
    assert_eq!(items[0]["status"], "failed");
    assert!(items[0]["last_error"]
        .as_str()
        .unwrap()
        .starts_with("HTTP 422"));
}

#[test]
fn sync_refuses_unreadable_queue() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("queue.jsonl"), "[not a record]\n").unwrap();

    tally(&temp, DEAD_REMOTE)
        .arg("sync")
        .assert()
        .failure()
        .stderr(predicate::str::contains("tally reset --yes"));
}
