// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable session catalog store: `sessions.json` (SPEC_FULL.md §4.4, §4.6).
//! Log contents are never persisted here — only session metadata, so
//! crash recovery can reconcile state without reconstructing the ring.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use devhost_core::{Session, SessionId};
use serde::{Deserialize, Serialize};

use crate::snapshot::{Snapshot, SnapshotError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionCatalogState {
    pub sessions: BTreeMap<String, Session>,
}

impl SessionCatalogState {
    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id.as_str())
    }

    pub fn upsert(&mut self, session: Session) {
        self.sessions.insert(session.id.as_str().to_string(), session);
    }

    pub fn remove(&mut self, id: &SessionId) -> Option<Session> {
        self.sessions.remove(id.as_str())
    }
}

pub struct SessionCatalogStore {
    path: PathBuf,
}

impl SessionCatalogStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("sessions.json"),
        }
    }

    pub fn load(&self) -> Result<SessionCatalogState, SnapshotError> {
        Ok(Snapshot::load(&self.path)?
            .map(|s| s.state)
            .unwrap_or_default())
    }

    /// Persist the catalog, preserving the prior file as `.bak` first —
    /// session state is the recovery source of truth, so a write that
    /// clobbers a good file with a bad one must still be reversible.
    pub fn save(&self, state: &SessionCatalogState) -> Result<(), SnapshotError> {
        Snapshot::new(state.clone()).save_with_backup(&self.path)
    }
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
