// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use axum::extract::State;
use axum::response::Response;
use devhost_core::Clock;
use serde::Serialize;

use super::{envelope_ok, AppState};

#[derive(Debug, Serialize)]
struct HealthResponse {
    ok: bool,
    version: &'static str,
    session_count: usize,
    uptime_s: u64,
}

pub async fn health<C: Clock>(State(state): State<Arc<AppState<C>>>) -> Response {
    envelope_ok(HealthResponse {
        ok: true,
        version: state.version,
        session_count: state.supervisor.list().len(),
        uptime_s: state.started_at.elapsed().as_secs(),
    })
}
