// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Port Registry (C1, SPEC_FULL.md §4.1): conflict-free port allocation
//! with a durable backing store. Single-writer via an internal mutex;
//! callers never need their own synchronization.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener};

use devhost_core::{port, PortAllocation, PortError, RuntimeClass, SessionId};
use devhost_storage::{PortRegistryState, PortRegistryStore};
use parking_lot::Mutex;

pub struct PortRegistry {
    store: PortRegistryStore,
    state: Mutex<PortRegistryState>,
}

impl PortRegistry {
    /// Load the registry from disk, or start empty if no snapshot exists.
    pub fn load(data_dir: &std::path::Path) -> Result<Self, devhost_storage::SnapshotError> {
        let store = PortRegistryStore::new(data_dir);
        let state = store.load()?;
        Ok(Self {
            store,
            state: Mutex::new(state),
        })
    }

    /// Allocate a port for `session_id` in `class`'s default range.
    ///
    /// `requested` pins a specific port; it is rejected outright (no
    /// fallback scan) if reserved, already tracked as in-use, or externally
    /// bound by another process. Otherwise the registry scans ascending
    /// from one past the last assignment in range, wrapping once.
    pub fn allocate(
        &self,
        session_id: &SessionId,
        class: RuntimeClass,
        requested: Option<u16>,
    ) -> Result<u16, PortError> {
        let mut state = self.state.lock();

        if let Some(port) = requested {
            self.check_available(&state, port)?;
            self.commit(&mut state, port, session_id, class);
            return Ok(port);
        }

        let range = port::default_range(class);
        let start_after = state
            .active
            .iter()
            .filter(|a| range.contains(a.port))
            .map(|a| a.port)
            .max()
            .unwrap_or(range.start.saturating_sub(1));

        let mut candidate = start_after.wrapping_add(1).max(range.start);
        for _ in 0..=(range.end - range.start) {
            if candidate > range.end {
                candidate = range.start;
            }
            if self.check_available(&state, candidate).is_ok() {
                self.commit(&mut state, candidate, session_id, class);
                return Ok(candidate);
            }
            candidate += 1;
        }

        Err(PortError::RangeExhausted {
            start: range.start,
            end: range.end,
        })
    }

    /// Release the port held by `session_id`, if any, moving it into the
    /// bounded history.
    pub fn release(&self, session_id: &SessionId) {
        let mut state = self.state.lock();
        if let Some(idx) = state
            .active
            .iter()
            .position(|a| &a.session_id == session_id)
        {
            let mut alloc = state.active.remove(idx);
            alloc.released_at = Some(chrono::Utc::now());
            state.record_release(alloc);
        }
        let _ = self.store.save(&state);
    }

    /// Up to three alternative ports to suggest alongside a conflict error.
    pub fn suggest(&self, class: RuntimeClass, count: usize) -> Vec<u16> {
        let state = self.state.lock();
        let range = port::default_range(class);
        let mut out = Vec::with_capacity(count);
        for port in range.start..=range.end {
            if out.len() >= count {
                break;
            }
            if self.check_available(&state, port).is_ok() {
                out.push(port);
            }
        }
        out
    }

    pub fn snapshot(&self) -> Vec<PortAllocation> {
        self.state.lock().active.clone()
    }

    fn check_available(&self, state: &PortRegistryState, port: u16) -> Result<(), PortError> {
        if port::is_system_reserved(port) {
            return Err(PortError::SystemReserved(port));
        }
        if state.active.iter().any(|a| a.port == port) {
            return Err(PortError::PortInUse(port));
        }
        if is_externally_bound(port) {
            return Err(PortError::PortExternallyBound(port));
        }
        Ok(())
    }

    fn commit(
        &self,
        state: &mut PortRegistryState,
        port: u16,
        session_id: &SessionId,
        class: RuntimeClass,
    ) {
        state.active.push(PortAllocation {
            port,
            session_id: session_id.clone(),
            runtime_class: class,
            assigned_at: chrono::Utc::now(),
            released_at: None,
        });
        let _ = self.store.save(state);
    }
}

/// Probe whether a port is already bound by something outside the registry's
/// bookkeeping, by attempting a loopback bind ourselves.
fn is_externally_bound(port: u16) -> bool {
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
    TcpListener::bind(addr).is_err()
}

#[cfg(test)]
#[path = "port_registry_tests.rs"]
mod tests;
