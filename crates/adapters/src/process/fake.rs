// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory Process Adapter for Session Supervisor tests: no real process
//! is ever spawned. Tests drive lifecycle via the returned [`FakeHandle`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use devhost_core::SpawnError;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use super::{CapturedLine, ExitStatus, ProcessAdapter, ProcessHandle, SpawnSpec, Stream};

struct Inner {
    next_pid: AtomicU32,
    alive: Mutex<std::collections::HashSet<u32>>,
    exit_txs: Mutex<HashMap<u32, oneshot::Sender<ExitStatus>>>,
    output_txs: Mutex<HashMap<u32, mpsc::Sender<CapturedLine>>>,
    fail_spawn: Mutex<Option<SpawnError>>,
}

/// Test double for [`ProcessAdapter`]. Clone freely; all clones share state.
#[derive(Clone)]
pub struct FakeProcessAdapter {
    inner: Arc<Inner>,
}

impl Default for FakeProcessAdapter {
    fn default() -> Self {
        Self {
            inner: Arc::new(Inner {
                next_pid: AtomicU32::new(1000),
                alive: Mutex::new(Default::default()),
                exit_txs: Mutex::new(HashMap::new()),
                output_txs: Mutex::new(HashMap::new()),
                fail_spawn: Mutex::new(None),
            }),
        }
    }
}

impl FakeProcessAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `spawn()` call fail with the given error.
    pub fn fail_next_spawn(&self, err: SpawnError) {
        *self.inner.fail_spawn.lock() = Some(err);
    }

    /// Push a captured output line to the given pid's subscriber, as if the
    /// spawned process had written to stdout/stderr.
    pub async fn push_line(&self, pid: u32, stream: Stream, line: &str) {
        if let Some(tx) = self.inner.output_txs.lock().get(&pid).cloned() {
            let _ = tx
                .send(CapturedLine {
                    stream,
                    bytes: line.as_bytes().to_vec(),
                    truncated: false,
                })
                .await;
        }
    }

    /// Simulate the process exiting on its own (e.g. a crash).
    pub fn simulate_exit(&self, pid: u32, exit: ExitStatus) {
        self.inner.alive.lock().remove(&pid);
        if let Some(tx) = self.inner.exit_txs.lock().remove(&pid) {
            let _ = tx.send(exit);
        }
    }
}

#[async_trait]
impl ProcessAdapter for FakeProcessAdapter {
    async fn spawn(&self, _spec: &SpawnSpec) -> Result<ProcessHandle, SpawnError> {
        if let Some(err) = self.inner.fail_spawn.lock().take() {
            return Err(err);
        }

        let pid = self.inner.next_pid.fetch_add(1, Ordering::SeqCst);
        self.inner.alive.lock().insert(pid);

        let (output_tx, output_rx) = mpsc::channel(256);
        let (exit_tx, exit_rx) = oneshot::channel();
        self.inner.output_txs.lock().insert(pid, output_tx);
        self.inner.exit_txs.lock().insert(pid, exit_tx);

        Ok(ProcessHandle {
            pid,
            output: output_rx,
            exit: exit_rx,
        })
    }

    async fn signal(&self, pid: u32) -> Result<(), SpawnError> {
        self.simulate_exit(
            pid,
            ExitStatus {
                code: Some(0),
                signal: None,
            },
        );
        Ok(())
    }

    async fn force_kill(&self, pid: u32) -> Result<(), SpawnError> {
        self.simulate_exit(
            pid,
            ExitStatus {
                code: None,
                signal: Some(9),
            },
        );
        Ok(())
    }

    async fn is_alive(&self, pid: u32) -> bool {
        self.inner.alive.lock().contains(&pid)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
