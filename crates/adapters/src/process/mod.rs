// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process Adapter (SPEC_FULL.md §4.3): a uniform spawn/signal/wait surface
//! over native subprocesses and containers, so the Session Supervisor never
//! branches on backend.

mod container;
mod native;

pub use container::ContainerAdapter;
pub use native::NativeAdapter;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeProcessAdapter;

use async_trait::async_trait;
use devhost_core::SpawnError;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Parameters for launching one session's process.
#[derive(Debug, Clone)]
pub struct SpawnSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: HashMap<String, String>,
    /// Set when the backend is `Container`: the image to run.
    pub container_image: Option<String>,
    pub port: Option<u16>,
}

/// A line captured from a spawned process's stdout or stderr, tagged by
/// origin stream. Max line length and truncation policy live in C2 (the log
/// ring); this type only carries the raw captured text.
#[derive(Debug, Clone)]
pub struct CapturedLine {
    pub stream: Stream,
    pub bytes: Vec<u8>,
    pub truncated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// Why a spawned process ended.
#[derive(Debug, Clone)]
pub struct ExitStatus {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

/// A live handle to a spawned process: its pid, a channel of captured
/// output lines, and a one-shot completion future.
pub struct ProcessHandle {
    pub pid: u32,
    pub output: mpsc::Receiver<CapturedLine>,
    pub exit: tokio::sync::oneshot::Receiver<ExitStatus>,
}

/// Platform-abstract interface over native processes and containers.
///
/// Implementations own one process group per spawned child so that
/// `signal`/`force_kill` reach the whole tree, not just the direct child.
#[async_trait]
pub trait ProcessAdapter: Send + Sync + 'static {
    async fn spawn(&self, spec: &SpawnSpec) -> Result<ProcessHandle, SpawnError>;

    /// Ask the process group to terminate gracefully (SIGTERM or
    /// equivalent). Does not block for exit; callers race this against
    /// `exit` with a deadline and escalate to `force_kill`.
    async fn signal(&self, pid: u32) -> Result<(), SpawnError>;

    /// Forcibly terminate the process group (SIGKILL or equivalent).
    async fn force_kill(&self, pid: u32) -> Result<(), SpawnError>;

    /// Best-effort liveness probe independent of the `exit` channel, used
    /// by crash detection when the channel itself may be stalled.
    async fn is_alive(&self, pid: u32) -> bool;
}
