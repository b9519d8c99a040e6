// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;

fn spec() -> SpawnSpec {
    SpawnSpec {
        program: "noop".to_string(),
        args: vec![],
        cwd: "/tmp".into(),
        env: HashMap::new(),
        container_image: None,
        port: Some(3000),
    }
}

#[tokio::test]
async fn spawn_assigns_increasing_pids() {
    let adapter = FakeProcessAdapter::new();
    let h1 = adapter.spawn(&spec()).await.unwrap();
    let h2 = adapter.spawn(&spec()).await.unwrap();
    assert_ne!(h1.pid, h2.pid);
}

#[tokio::test]
async fn signal_marks_process_dead_and_completes_exit() {
    let adapter = FakeProcessAdapter::new();
    let handle = adapter.spawn(&spec()).await.unwrap();
    assert!(adapter.is_alive(handle.pid).await);

    adapter.signal(handle.pid).await.unwrap();
    assert!(!adapter.is_alive(handle.pid).await);

    let exit = handle.exit.await.unwrap();
    assert_eq!(exit.code, Some(0));
}

#[tokio::test]
async fn pushed_lines_are_observed_by_subscriber() {
    let adapter = FakeProcessAdapter::new();
    let mut handle = adapter.spawn(&spec()).await.unwrap();
    adapter.push_line(handle.pid, Stream::Stdout, "ready").await;

    let line = handle.output.recv().await.unwrap();
    assert_eq!(line.bytes, b"ready");
}

#[tokio::test]
async fn fail_next_spawn_surfaces_configured_error() {
    let adapter = FakeProcessAdapter::new();
    adapter.fail_next_spawn(SpawnError::ExecutableNotFound("x".into()));
    let err = adapter.spawn(&spec()).await.unwrap_err();
    assert!(matches!(err, SpawnError::ExecutableNotFound(_)));
}
