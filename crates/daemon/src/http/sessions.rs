// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool-operation handlers: `start`, `stop`/`delete`, `restart`, `status`,
//! `list`, `logs_tail`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use devhost_core::{
    Backend, Clock, Command, DevhostError, PortError, RestartConfig, RestartPolicy, RuntimeClass,
    Session, SessionId, SessionState,
};
use serde::{Deserialize, Serialize};

use super::{envelope_ok, envelope_port_conflict, ApiError, AppState};
use crate::supervisor::NewSession;

type HandlerResult = Result<Response, ApiError>;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PortField {
    Fixed(u16),
    Auto(String),
}

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    #[serde(default)]
    name: Option<String>,
    command: Command,
    #[serde(default)]
    cwd: Option<String>,
    #[serde(default)]
    port: Option<PortField>,
    #[serde(default)]
    env: HashMap<String, String>,
    #[serde(default)]
    runtime_class: Option<RuntimeClass>,
    #[serde(default)]
    backend: Option<Backend>,
    #[serde(default)]
    container_image: Option<String>,
    #[serde(default)]
    restart_policy: Option<RestartPolicy>,
}

#[derive(Debug, Serialize)]
pub struct StartResponse {
    session_id: SessionId,
    port: Option<u16>,
    pid: Option<u32>,
    state: SessionState,
}

pub async fn start<C: Clock>(
    State(state): State<Arc<AppState<C>>>,
    Json(req): Json<StartRequest>,
) -> HandlerResult {
    tracing::debug!(?req, "start_session request");

    let requested_port = match req.port {
        None => None,
        Some(PortField::Fixed(p)) => Some(p),
        Some(PortField::Auto(tag)) if tag == "auto" => None,
        Some(PortField::Auto(other)) => {
            return Err(ApiError(DevhostError::InvalidParams(format!(
                "port must be a number or \"auto\", got {other:?}"
            ))));
        }
    };

    let restart = RestartConfig {
        policy: req.restart_policy.unwrap_or(RestartPolicy::Never),
        ..RestartConfig::default()
    };

    let new_session = NewSession {
        name: req.name.unwrap_or_else(|| "session".to_string()),
        command: req.command,
        cwd: req.cwd.unwrap_or_else(|| ".".to_string()),
        env: req.env,
        runtime_class: req.runtime_class.unwrap_or(RuntimeClass::Generic),
        backend: req.backend.unwrap_or(Backend::Native),
        container_image: req.container_image,
        requested_port,
        restart,
    };

    match state.supervisor.start_session(new_session).await {
        Ok(id) => {
            let session = state.supervisor.get(&id).ok_or_else(|| {
                ApiError(DevhostError::Internal(
                    "just-created session must be present".to_string(),
                ))
            })?;
            Ok(envelope_ok(StartResponse {
                session_id: id,
                port: session.port,
                pid: session.pid,
                state: session.state,
            }))
        }
        Err(DevhostError::Port(err @ PortError::PortInUse(_))) => {
            Ok(envelope_port_conflict(&state.supervisor, err))
        }
        Err(err) => Err(ApiError(err)),
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    state: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    sessions: Vec<Session>,
    total: usize,
}

pub async fn list<C: Clock>(
    State(state): State<Arc<AppState<C>>>,
    Query(query): Query<ListQuery>,
) -> HandlerResult {
    let mut sessions = state.supervisor.list();
    if let Some(filter) = query.state {
        sessions.retain(|s| state_name(s.state) == filter);
    }
    sessions.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
    let total = sessions.len();
    Ok(envelope_ok(ListResponse { sessions, total }))
}

fn state_name(s: SessionState) -> &'static str {
    match s {
        SessionState::Starting => "starting",
        SessionState::Running => "running",
        SessionState::Stopping => "stopping",
        SessionState::Stopped => "stopped",
        SessionState::Failed => "failed",
        SessionState::Crashed => "crashed",
    }
}

pub async fn get_one<C: Clock>(
    State(state): State<Arc<AppState<C>>>,
    Path(id): Path<String>,
) -> HandlerResult {
    let id = SessionId::new(id);
    state
        .supervisor
        .get(&id)
        .map(envelope_ok)
        .ok_or_else(|| ApiError(DevhostError::NotFound(format!("session {id}"))))
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteBody {
    #[serde(default)]
    force: bool,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    state: SessionState,
}

/// `DELETE /v1/sessions/{id}`: stops a non-terminal session (honoring
/// `force`), or — if it is already terminal — performs the explicit delete
/// that finally drops its record (SPEC_FULL.md §4.4: `stop` alone never
/// destroys a session).
pub async fn stop_or_delete<C: Clock>(
    State(state): State<Arc<AppState<C>>>,
    Path(id): Path<String>,
    body: Option<Json<DeleteBody>>,
) -> HandlerResult {
    let id = SessionId::new(id);
    let force = body.map(|b| b.0.force).unwrap_or(false);

    let before = state
        .supervisor
        .get(&id)
        .ok_or_else(|| ApiError(DevhostError::NotFound(format!("session {id}"))))?;

    if !before.state.is_terminal() {
        match tokio::time::timeout(
            state.operation_deadline,
            state.supervisor.stop_session(&id, force),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(ApiError(err)),
            Err(_elapsed) => {
                return Err(ApiError(DevhostError::Timeout(
                    "stop did not complete in time".into(),
                )))
            }
        }
        let after = state.supervisor.get(&id).unwrap_or(before);
        return Ok(envelope_ok(DeleteResponse { state: after.state }));
    }

    state
        .supervisor
        .delete_session(&id)
        .map(|()| envelope_ok(DeleteResponse { state: before.state }))
        .map_err(ApiError)
}

#[derive(Debug, Serialize)]
pub struct RestartResponse {
    state: SessionState,
    port: Option<u16>,
    pid: Option<u32>,
}

pub async fn restart<C: Clock>(
    State(state): State<Arc<AppState<C>>>,
    Path(id): Path<String>,
) -> HandlerResult {
    let id = SessionId::new(id);
    match tokio::time::timeout(
        state.operation_deadline,
        state.supervisor.restart_session(&id),
    )
    .await
    {
        Ok(Ok(())) => state
            .supervisor
            .get(&id)
            .map(|session| {
                envelope_ok(RestartResponse {
                    state: session.state,
                    port: session.port,
                    pid: session.pid,
                })
            })
            .ok_or_else(|| ApiError(DevhostError::NotFound(format!("session {id}")))),
        Ok(Err(err)) => Err(ApiError(err)),
        Err(_elapsed) => Err(ApiError(DevhostError::Timeout(
            "restart did not complete in time".into(),
        ))),
    }
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    limit: Option<usize>,
    since_seq: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    events: Vec<devhost_core::LogEvent>,
    earliest_seq: Option<u64>,
    latest_seq: Option<u64>,
}

const DEFAULT_LOGS_LIMIT: usize = 200;

pub async fn logs_tail<C: Clock>(
    State(state): State<Arc<AppState<C>>>,
    Path(id): Path<String>,
    Query(query): Query<LogsQuery>,
) -> HandlerResult {
    let id = SessionId::new(id);
    let ring = state
        .supervisor
        .ring(&id)
        .ok_or_else(|| ApiError(DevhostError::NotFound(format!("session {id}"))))?;

    let tail = ring.tail();
    let earliest_seq = tail.first().map(|e| e.seq);
    let latest_seq = tail.last().map(|e| e.seq);

    let since = query.since_seq.unwrap_or(0);
    let limit = query.limit.unwrap_or(DEFAULT_LOGS_LIMIT);
    let events: Vec<_> = tail
        .into_iter()
        .filter(|e| e.seq >= since)
        .rev()
        .take(limit)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    Ok(envelope_ok(LogsResponse {
        events,
        earliest_seq,
        latest_seq,
    }))
}
