// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Utc;
use devhost_core::{RuntimeClass, SessionId};
use tempfile::tempdir;

fn alloc(port: u16) -> PortAllocation {
    PortAllocation {
        port,
        session_id: SessionId::new("s-1"),
        runtime_class: RuntimeClass::Node,
        assigned_at: Utc::now(),
        released_at: None,
    }
}

#[test]
fn load_on_empty_dir_returns_default() {
    let dir = tempdir().unwrap();
    let store = PortRegistryStore::new(dir.path());
    let state = store.load().unwrap();
    assert!(state.active.is_empty());
}

#[test]
fn save_then_load_round_trips() {
    let dir = tempdir().unwrap();
    let store = PortRegistryStore::new(dir.path());

    let mut state = PortRegistryState::default();
    state.active.push(alloc(3000));
    store.save(&state).unwrap();

    let loaded = store.load().unwrap();
    assert_eq!(loaded.active.len(), 1);
    assert_eq!(loaded.active[0].port, 3000);
}

#[test]
fn history_is_bounded() {
    let mut state = PortRegistryState::default();
    for p in 0..(HISTORY_LIMIT as u16 + 10) {
        state.record_release(alloc(3000 + p));
    }
    assert_eq!(state.history.len(), HISTORY_LIMIT);
}
