// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Utc;
use devhost_core::{Backend, Command, RestartConfig, RuntimeClass, SessionState};
use std::collections::HashMap;
use tempfile::tempdir;

fn sample(id: &str) -> Session {
    Session {
        id: SessionId::new(id),
        name: "web".into(),
        command: Command {
            program: "npm".into(),
            args: vec![],
        },
        cwd: "/tmp".into(),
        env: HashMap::new(),
        runtime_class: RuntimeClass::Node,
        backend: Backend::Native,
        container_image: None,
        port: Some(3000),
        pid: Some(1),
        state: SessionState::Running,
        exit: None,
        started_at: Some(Utc::now()),
        state_changed_at: Utc::now(),
        restart: RestartConfig::default(),
        restart_count: 0,
        last_restart_at: None,
    }
}

#[test]
fn upsert_and_get() {
    let mut state = SessionCatalogState::default();
    state.upsert(sample("s-1"));
    assert!(state.get(&SessionId::new("s-1")).is_some());
}

#[test]
fn remove_deletes_entry() {
    let mut state = SessionCatalogState::default();
    state.upsert(sample("s-1"));
    let removed = state.remove(&SessionId::new("s-1"));
    assert!(removed.is_some());
    assert!(state.get(&SessionId::new("s-1")).is_none());
}

#[test]
fn save_preserves_previous_as_bak() {
    let dir = tempdir().unwrap();
    let store = SessionCatalogStore::new(dir.path());

    let mut first = SessionCatalogState::default();
    first.upsert(sample("s-1"));
    store.save(&first).unwrap();

    let mut second = SessionCatalogState::default();
    second.upsert(sample("s-2"));
    store.save(&second).unwrap();

    let loaded = store.load().unwrap();
    assert!(loaded.get(&SessionId::new("s-2")).is_some());
    assert!(dir.path().join("sessions.bak").exists());
}
