// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log event shape shared by the ring buffer (C2), the SSE log stream (C5),
//! and the `logs` CLI command.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStream {
    Stdout,
    Stderr,
    /// Synthetic events the ring itself emits: drop notices, gap notices.
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// One line of captured output, or a synthetic ring-bookkeeping event.
///
/// `seq` is strictly increasing and gap-free within a session's ring; a gap
/// in what a subscriber observes is always accompanied by a `System` event
/// naming the number of entries lost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub seq: u64,
    pub ts: DateTime<Utc>,
    pub stream: LogStream,
    pub level: LogLevel,
    pub line: String,
    #[serde(default)]
    pub truncated: bool,
}

impl LogEvent {
    pub fn system(seq: u64, ts: DateTime<Utc>, line: String) -> Self {
        Self {
            seq,
            ts,
            stream: LogStream::System,
            level: LogLevel::Warn,
            line,
            truncated: false,
        }
    }
}

#[cfg(test)]
#[path = "log_event_tests.rs"]
mod tests;
