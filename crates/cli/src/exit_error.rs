// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! An [`anyhow::Error`] carrying the process exit code it should produce.
//!
//! Commands return plain `anyhow::Result<()>`; when they need a specific
//! exit code (1 for a user error, 2 for a system error) they attach one of
//! these via `.context(ExitError::user(...))`-style construction and
//! `main` unwraps it with `downcast_ref`.

use std::fmt;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
}

impl ExitError {
    /// User error: bad arguments, not found, conflict. Exit code 1.
    pub fn user() -> Self {
        Self { code: 1 }
    }

    /// System error: connection refused, timeout, internal error. Exit code 2.
    pub fn system() -> Self {
        Self { code: 2 }
    }
}

impl fmt::Display for ExitError {
    // Empty: `ExitError` is always wrapped with `.context(message)` for the
    // text a user actually sees. An empty cause keeps `main`'s error-chain
    // dedup from printing a redundant "Caused by: exit code N" line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "")
    }
}

impl std::error::Error for ExitError {}

/// Build a user-error `anyhow::Error` (exit code 1) with `message` as the
/// text `main` prints. `ExitError` is the root cause so `downcast_ref`
/// still finds it after `.context()`; its own empty `Display` is never
/// shown because it is the *innermost* cause, not the outer context.
pub fn user_error(message: impl std::fmt::Display) -> anyhow::Error {
    anyhow::Error::new(ExitError::user()).context(message.to_string())
}

/// Build a system-error `anyhow::Error` (exit code 2). See [`user_error`].
pub fn system_error(message: impl std::fmt::Display) -> anyhow::Error {
    anyhow::Error::new(ExitError::system()).context(message.to_string())
}
