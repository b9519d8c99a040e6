// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Port range policy and allocation records shared by the registry (C1) and
//! its persisted snapshot (C6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::RuntimeClass;

/// Inclusive port range for a runtime class.
#[derive(Debug, Clone, Copy)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl PortRange {
    pub const fn new(start: u16, end: u16) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, port: u16) -> bool {
        port >= self.start && port <= self.end
    }
}

pub const RANGE_NODE: PortRange = PortRange::new(3000, 3999);
pub const RANGE_STATIC: PortRange = PortRange::new(4000, 4999);
pub const RANGE_PYTHON: PortRange = PortRange::new(5000, 5999);
pub const RANGE_PHP: PortRange = PortRange::new(8080, 8980);
pub const RANGE_SYSTEM_RESERVED: PortRange = PortRange::new(2601, 2699);

/// Default range for a runtime class. `Generic` shares Node's range, as
/// fixed by SPEC_FULL.md §4.1.
pub fn default_range(class: RuntimeClass) -> PortRange {
    match class {
        RuntimeClass::Node | RuntimeClass::Generic => RANGE_NODE,
        RuntimeClass::Static => RANGE_STATIC,
        RuntimeClass::Python => RANGE_PYTHON,
        RuntimeClass::Php => RANGE_PHP,
    }
}

pub fn is_system_reserved(port: u16) -> bool {
    RANGE_SYSTEM_RESERVED.contains(port)
}

/// A single port assigned to a session. `released_at` is set when the
/// session frees the port but the record is retained in the bounded
/// history kept by the registry snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortAllocation {
    pub port: u16,
    pub session_id: crate::session::SessionId,
    pub runtime_class: RuntimeClass,
    pub assigned_at: DateTime<Utc>,
    #[serde(default)]
    pub released_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
#[path = "port_tests.rs"]
mod tests;
