// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log replay scenario (spec.md §8 S5), scaled down to a ring capacity of
//! 10 (instead of 10,000) so the test pushes tens, not thousands, of lines
//! while exercising the same gap-on-resume behavior.

use std::time::Duration;

use futures::StreamExt;

use crate::prelude::{fake_listen, node_command, ServerConfig, TestServer};

#[tokio::test]
async fn s5_subscriber_resuming_past_an_evicted_seq_gets_a_gap_event() {
    let config = ServerConfig {
        log_ring_capacity: 10,
        ..ServerConfig::default()
    };
    let (server, _tmp) = TestServer::start(config).await;

    let started = server
        .start_session(serde_json::json!({
            "command": node_command(),
            "cwd": "/tmp",
            "port": "auto",
            "runtime_class": "generic",
        }))
        .await;
    let id = started["result"]["session_id"].as_str().unwrap().to_string();
    let port = started["result"]["port"].as_u64().unwrap() as u16;
    fake_listen(port).await;

    let running = server
        .wait_for_state(&id, "running", Duration::from_secs(3))
        .await;
    let pid = running["result"]["pid"].as_u64().unwrap() as u32;

    for i in 0..15 {
        server
            .fake
            .push_line(pid, devhost_adapters::Stream::Stdout, &format!("line {i}"))
            .await;
    }

    // Give the actor's select loop time to drain the output channel into
    // the ring before a subscriber resumes past the eviction point.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let resp = server
        .client
        .get(server.url(&format!("/v1/sessions/{id}/logs/stream?since_seq=0")))
        .send()
        .await
        .expect("open log stream");
    assert!(resp.status().is_success());

    let mut stream = resp.bytes_stream();
    let mut buf = String::new();
    let saw_gap = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let chunk = stream.next().await.expect("stream ended before a gap event")
                .expect("stream error");
            buf.push_str(&String::from_utf8_lossy(&chunk));
            if buf.contains("event: gap") {
                return true;
            }
        }
    })
    .await
    .unwrap_or(false);

    assert!(saw_gap, "expected a gap event in the resumed stream, got: {buf}");
}
