// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The closed error taxonomy shared across components (SPEC_FULL.md §7).
//!
//! Lower layers return these variants directly; only the Control Plane (C5)
//! maps them onto HTTP status codes and the wire error-code set. No layer
//! below C5 knows about HTTP.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum PortError {
    #[error("port {0} is reserved for system use")]
    SystemReserved(u16),
    #[error("port {0} is already in use")]
    PortInUse(u16),
    #[error("port {0} is externally bound")]
    PortExternallyBound(u16),
    #[error("no free port in range {start}-{end}")]
    RangeExhausted { start: u16, end: u16 },
}

#[derive(Debug, Clone, Error)]
pub enum SpawnError {
    #[error("working directory {0} does not exist")]
    CwdMissing(String),
    #[error("executable {0} not found")]
    ExecutableNotFound(String),
    #[error("permission denied executing {0}")]
    PermissionDenied(String),
    #[error("resource exhausted spawning process: {0}")]
    ResourceExhausted(String),
}

#[derive(Debug, Error)]
pub enum DevhostError {
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Port(#[from] PortError),
    #[error(transparent)]
    Spawn(#[from] SpawnError),
    #[error("session not ready: {0}")]
    NotReady(String),
    #[error("operation timed out: {0}")]
    Timeout(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl DevhostError {
    /// The closed wire error code this variant maps to at the Control Plane
    /// boundary (SPEC_FULL.md §7 / spec.md §6 error table).
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidParams(_) => "invalid_params",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Port(PortError::SystemReserved(_)) => "port_system_reserved",
            Self::Port(PortError::PortInUse(_)) => "port_in_use",
            Self::Port(PortError::PortExternallyBound(_)) => "port_externally_bound",
            Self::Port(PortError::RangeExhausted { .. }) => "port_range_exhausted",
            Self::Spawn(SpawnError::CwdMissing(_)) => "spawn_cwd_missing",
            Self::Spawn(SpawnError::ExecutableNotFound(_)) => "spawn_executable_not_found",
            Self::Spawn(SpawnError::PermissionDenied(_)) => "spawn_permission_denied",
            Self::Spawn(SpawnError::ResourceExhausted(_)) => "spawn_resource_exhausted",
            Self::NotReady(_) => "not_ready",
            Self::Timeout(_) => "timeout",
            Self::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
