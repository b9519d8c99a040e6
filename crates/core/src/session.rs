// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session domain model: the lifecycle state machine for one managed dev server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::define_id;

define_id! {
    /// Unique identifier for a supervised session.
    pub struct SessionId;
}

/// Which class of runtime a session belongs to. Selects the default port
/// range (see `devhost_core::port`) and, for non-generic classes, informs
/// container image selection when `backend = Container`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeClass {
    Node,
    Python,
    Php,
    Static,
    Generic,
}

/// Which Process Adapter backend owns a session's child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Native,
    Container,
}

/// Session lifecycle state. See SPEC_FULL.md §3 for the transition diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Starting,
    Running,
    Stopping,
    Stopped,
    Failed,
    Crashed,
}

impl SessionState {
    /// A session in one of these states has no live process and is eligible
    /// for restart or permanent retirement.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Failed | Self::Crashed)
    }
}

/// Tag-only projection of [`SessionState`], used where only the discriminant
/// matters (e.g. `?state=` query filtering) without the rest of [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStateKind {
    Starting,
    Running,
    Stopping,
    Stopped,
    Failed,
    Crashed,
}

impl From<SessionState> for SessionStateKind {
    fn from(s: SessionState) -> Self {
        match s {
            SessionState::Starting => Self::Starting,
            SessionState::Running => Self::Running,
            SessionState::Stopping => Self::Stopping,
            SessionState::Stopped => Self::Stopped,
            SessionState::Failed => Self::Failed,
            SessionState::Crashed => Self::Crashed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartPolicy {
    Never,
    OnCrash,
    Always,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestartConfig {
    pub policy: RestartPolicy,
    pub max_restarts: u32,
    pub backoff_initial_ms: u64,
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            policy: RestartPolicy::Never,
            max_restarts: 5,
            backoff_initial_ms: 500,
        }
    }
}

/// The argv command a session's process adapter spawns. Shell interpretation
/// is never performed by the core contract; a client that wants shell
/// semantics must shell-split client-side (see SPEC_FULL.md Open Questions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitInfo {
    pub exit_code: Option<i32>,
    pub exit_signal: Option<i32>,
    pub exit_reason: String,
}

/// A managed dev server and its full lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub name: String,
    pub command: Command,
    pub cwd: String,
    #[serde(default)]
    pub env: HashMap<String, String>,
    pub runtime_class: RuntimeClass,
    pub backend: Backend,
    #[serde(default)]
    pub container_image: Option<String>,
    pub port: Option<u16>,
    pub pid: Option<u32>,
    pub state: SessionState,
    #[serde(default)]
    pub exit: Option<ExitInfo>,
    pub started_at: Option<DateTime<Utc>>,
    pub state_changed_at: DateTime<Utc>,
    pub restart: RestartConfig,
    #[serde(default)]
    pub restart_count: u32,
    #[serde(default)]
    pub last_restart_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Whether `next` is a legal transition out of this session's current state.
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self.state, next),
            (Starting, Running)
                | (Starting, Failed)
                | (Starting, Crashed)
                | (Starting, Stopping)
                | (Running, Stopping)
                | (Running, Crashed)
                | (Stopping, Stopped)
                | (Stopping, Crashed)
        )
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
