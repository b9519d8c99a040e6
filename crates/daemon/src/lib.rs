// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! devhost daemon library: the Session Supervisor (C4) and Control Plane
//! (C5) that `devhostd` wires together at startup.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod http;
pub mod log_ring;
pub mod port_registry;
pub mod status_ring;
pub mod supervisor;

pub use log_ring::LogRing;
pub use port_registry::PortRegistry;
pub use status_ring::{StatusEvent, StatusRing};
pub use supervisor::{NewSession, Supervisor};
