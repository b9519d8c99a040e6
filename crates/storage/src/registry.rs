// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable port registry store: `ports.json` (SPEC_FULL.md §4.1, §6).

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use devhost_core::PortAllocation;
use serde::{Deserialize, Serialize};

use crate::snapshot::{Snapshot, SnapshotError};

const HISTORY_LIMIT: usize = 100;

/// Registry state as persisted to disk: currently-held allocations plus a
/// bounded history of released ones, for post-mortem debugging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortRegistryState {
    pub active: Vec<PortAllocation>,
    #[serde(default)]
    pub history: VecDeque<PortAllocation>,
}

impl PortRegistryState {
    pub fn record_release(&mut self, alloc: PortAllocation) {
        self.history.push_back(alloc);
        while self.history.len() > HISTORY_LIMIT {
            self.history.pop_front();
        }
    }
}

pub struct PortRegistryStore {
    path: PathBuf,
}

impl PortRegistryStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("ports.json"),
        }
    }

    pub fn load(&self) -> Result<PortRegistryState, SnapshotError> {
        Ok(Snapshot::load(&self.path)?
            .map(|s| s.state)
            .unwrap_or_default())
    }

    pub fn save(&self, state: &PortRegistryState) -> Result<(), SnapshotError> {
        Snapshot::new(state.clone()).save(&self.path)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
