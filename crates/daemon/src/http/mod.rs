// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control Plane (C5, SPEC_FULL.md §4.5): the loopback HTTP+SSE surface.
//!
//! Tool-operation handlers post requests to the Session Supervisor and await
//! its reply; streaming handlers register cursors with the Log Ring or the
//! Status Ring and run independently of the request/response path.

mod health;
mod sessions;
mod stream;

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use devhost_core::{Clock, DevhostError, PortError, SpawnError, SystemClock};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::supervisor::Supervisor;

/// Shared context every handler draws on.
pub struct AppState<C: Clock = SystemClock> {
    pub supervisor: Arc<Supervisor<C>>,
    pub started_at: Instant,
    pub version: &'static str,
    pub sse_heartbeat: Duration,
    pub sse_write_deadline: Duration,
    pub operation_deadline: Duration,
}

pub fn router<C: Clock>(state: Arc<AppState<C>>) -> Router {
    Router::new()
        .route("/v1/sessions", post(sessions::start))
        .route("/v1/sessions", get(sessions::list))
        .route("/v1/sessions/{id}", get(sessions::get_one))
        .route("/v1/sessions/{id}", delete(sessions::stop_or_delete))
        .route("/v1/sessions/{id}/restart", post(sessions::restart))
        .route("/v1/sessions/{id}/logs", get(sessions::logs_tail))
        .route("/v1/sessions/{id}/logs/stream", get(stream::logs_subscribe))
        .route("/v1/events/stream", get(stream::status_subscribe))
        .route("/v1/health", get(health::health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// The closed response envelope (spec.md §6): `{result, error}`, with error
/// drawn from a fixed code set and an HTTP status derived from it.
#[derive(Serialize)]
struct Envelope<T: Serialize> {
    result: Option<T>,
    error: Option<ErrorBody>,
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    details: Value,
}

pub struct ApiError(pub DevhostError);

impl From<DevhostError> for ApiError {
    fn from(err: DevhostError) -> Self {
        Self(err)
    }
}

fn wire_code_and_status(err: &DevhostError) -> (&'static str, StatusCode) {
    match err {
        DevhostError::InvalidParams(_) => ("INVALID_PARAMS", StatusCode::BAD_REQUEST),
        DevhostError::NotFound(_) => ("NOT_FOUND", StatusCode::NOT_FOUND),
        DevhostError::Conflict(_) => ("CONFLICT", StatusCode::BAD_REQUEST),
        DevhostError::Port(_) => ("PORT_ERROR", StatusCode::BAD_REQUEST),
        DevhostError::Spawn(_) => ("SPAWN_ERROR", StatusCode::BAD_REQUEST),
        DevhostError::NotReady(_) => ("NOT_READY", StatusCode::CONFLICT),
        DevhostError::Timeout(_) => ("TIMEOUT", StatusCode::REQUEST_TIMEOUT),
        DevhostError::Internal(_) => ("INTERNAL_ERROR", StatusCode::INTERNAL_SERVER_ERROR),
    }
}

/// `details` for the port-conflict scenario the spec calls out by name
/// (spec.md S2): the session already holding the port, and alternatives.
fn port_error_details<C: Clock>(supervisor: &Supervisor<C>, err: &PortError) -> Value {
    match err {
        PortError::PortInUse(port) => {
            let holder = supervisor
                .ports()
                .snapshot()
                .into_iter()
                .find(|a| a.port == *port);
            let runtime_class = holder
                .as_ref()
                .map(|a| a.runtime_class)
                .unwrap_or(devhost_core::RuntimeClass::Generic);
            let conflicting = holder.map(|a| a.session_id.to_string());
            let suggestions = supervisor.ports().suggest(runtime_class, 3);
            json!({ "sub": "PortInUse", "conflicting_session_id": conflicting, "suggestions": suggestions })
        }
        PortError::SystemReserved(port) => json!({ "sub": "SystemReserved", "port": port }),
        PortError::PortExternallyBound(port) => json!({ "sub": "PortExternallyBound", "port": port }),
        PortError::RangeExhausted { start, end } => {
            json!({ "sub": "RangeExhausted", "start": start, "end": end })
        }
    }
}

fn spawn_error_details(err: &SpawnError) -> Value {
    match err {
        SpawnError::CwdMissing(p) => json!({ "sub": "CwdMissing", "path": p }),
        SpawnError::ExecutableNotFound(p) => json!({ "sub": "ExecutableNotFound", "path": p }),
        SpawnError::PermissionDenied(p) => json!({ "sub": "PermissionDenied", "path": p }),
        SpawnError::ResourceExhausted(m) => json!({ "sub": "ResourceExhausted", "reason": m }),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (code, status) = wire_code_and_status(&self.0);
        let message = self.0.to_string();
        let details = match &self.0 {
            DevhostError::Port(e) => json!({ "port": e.to_string() }),
            DevhostError::Spawn(e) => spawn_error_details(e),
            _ => Value::Object(Default::default()),
        };
        tracing::warn!(code, %message, "request failed");
        let body = Envelope::<()> {
            result: None,
            error: Some(ErrorBody {
                code,
                message,
                details,
            }),
        };
        (status, Json(body)).into_response()
    }
}

/// Build a success envelope, wrapping an error the same way [`ApiError`]
/// does when the handler's fallible work produced one up front (e.g. the
/// port-conflict detail enrichment, which needs `&Supervisor` in scope).
fn ok<T: Serialize>(payload: T) -> axum::response::Response {
    (
        StatusCode::OK,
        Json(Envelope {
            result: Some(payload),
            error: None,
        }),
    )
        .into_response()
}

/// Enriched error response for the one case the spec names explicit
/// `details` for: a port already held by another session.
fn port_conflict_response<C: Clock>(
    supervisor: &Supervisor<C>,
    err: PortError,
) -> axum::response::Response {
    let details = port_error_details(supervisor, &err);
    let devhost_err = DevhostError::Port(err);
    let (code, status) = wire_code_and_status(&devhost_err);
    let body = Envelope::<()> {
        result: None,
        error: Some(ErrorBody {
            code,
            message: devhost_err.to_string(),
            details,
        }),
    };
    (status, Json(body)).into_response()
}

pub(crate) use {ok as envelope_ok, port_conflict_response as envelope_port_conflict};
