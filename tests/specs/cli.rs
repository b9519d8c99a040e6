// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end coverage for the `devhost` CLI binary against an in-process
//! Control Plane, plus its exit-code contract (spec.md §6: 0 success, 1
//! user error, 2 system error).

use std::process::{Command, Output};

use crate::prelude::{node_command, ServerConfig, TestServer};

fn devhost(args: &[&str], url: Option<&str>) -> Output {
    let bin = assert_cmd::cargo::cargo_bin("devhost");
    let mut cmd = Command::new(bin);
    cmd.args(args);
    if let Some(url) = url {
        cmd.env("DEVHOST_URL", url);
    }
    cmd.output().expect("run devhost")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

#[test]
fn help_exits_zero_and_names_the_program() {
    let out = devhost(&["--help"], None);
    assert!(out.status.success());
    assert!(stdout(&out).contains("devhost"));
}

#[test]
fn version_exits_zero() {
    let out = devhost(&["--version"], None);
    assert!(out.status.success());
}

#[tokio::test]
async fn health_against_a_live_daemon_exits_zero() {
    let (server, _tmp) = TestServer::start(ServerConfig::default()).await;

    let out = devhost(&["health"], Some(&server.base_url));
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(stdout(&out).contains("devhostd"));
}

#[tokio::test]
async fn status_on_an_unknown_session_exits_one_with_not_found() {
    let (server, _tmp) = TestServer::start(ServerConfig::default()).await;

    let out = devhost(&["status", "does-not-exist"], Some(&server.base_url));
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("not found"), "{}", stderr(&out));
}

#[tokio::test]
async fn start_and_stop_round_trip_through_the_cli_exits_zero() {
    let (server, _tmp) = TestServer::start(ServerConfig::default()).await;

    let started = server
        .start_session(serde_json::json!({
            "command": node_command(),
            "cwd": "/tmp",
            "port": "auto",
            "runtime_class": "node",
        }))
        .await;
    let id = started["result"]["session_id"].as_str().unwrap().to_string();

    let out = devhost(&["status", &id, "-o", "json"], Some(&server.base_url));
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(stdout(&out).contains(&id));

    let out = devhost(&["stop", &id], Some(&server.base_url));
    assert!(out.status.success(), "{}", stderr(&out));
}

#[test]
fn unreachable_daemon_exits_two() {
    let out = devhost(&["health"], Some("http://127.0.0.1:1"));
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("could not reach devhostd"), "{}", stderr(&out));
}
