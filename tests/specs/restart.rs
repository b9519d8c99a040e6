// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash-restart scenario (spec.md §8 S3), scoped to what
//! `FakeProcessAdapter` can drive deterministically: a start-time
//! `RestartPolicy` (the Control Plane's `StartRequest` does not yet expose
//! `max_restarts`/`backoff_initial_ms` — see DESIGN.md) isn't enough to
//! reliably exercise the full three-crash-to-Failed progression inside a
//! single test without a very long sleep, so this covers one crash/restart
//! cycle: Running -> Crashed -> Starting -> Running, with `restart_count`
//! incremented.

use std::time::Duration;

use crate::prelude::{fake_listen, node_command, ServerConfig, TestServer};
use devhost_adapters::ExitStatus;

#[tokio::test]
async fn s3_on_crash_restart_brings_session_back_to_running() {
    let (server, _tmp) = TestServer::start(ServerConfig::default()).await;

    let started = server
        .start_session(serde_json::json!({
            "command": node_command(),
            "cwd": "/tmp",
            "port": "auto",
            "runtime_class": "node",
            "restart_policy": "on_crash",
        }))
        .await;
    let id = started["result"]["session_id"].as_str().unwrap().to_string();
    let port = started["result"]["port"].as_u64().unwrap() as u16;
    fake_listen(port).await;

    let running = server
        .wait_for_state(&id, "running", Duration::from_secs(3))
        .await;
    let pid = running["result"]["pid"].as_u64().unwrap() as u32;

    server.fake.simulate_exit(
        pid,
        ExitStatus {
            code: Some(1),
            signal: None,
        },
    );

    server
        .wait_for_state(&id, "crashed", Duration::from_secs(1))
        .await;

    // The actor respawns on the same port after `backoff_initial_ms`
    // (default 500ms); the listener bound above is still accepting, so the
    // new process's readiness probe is satisfied the same way.
    let recovered = server
        .wait_for_state(&id, "running", Duration::from_secs(3))
        .await;
    assert_eq!(recovered["result"]["restart_count"], 1);
}
