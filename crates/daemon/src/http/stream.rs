// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `logs_subscribe` and `status_subscribe`: the two SSE streams. Both follow
//! the same wire shape (spec.md §4.5): `seq` as the SSE event id so clients
//! resume with `Last-Event-ID`, a 15s idle heartbeat comment frame, and a
//! `gap` event first when resuming past an evicted sequence.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use devhost_core::{Clock, DevhostError, LogStream};
use futures::Stream;
use serde::Deserialize;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use super::{ApiError, AppState};
use crate::status_ring::StatusEvent;

#[derive(Debug, Deserialize)]
pub struct ResumeQuery {
    since_seq: Option<u64>,
}

/// `Last-Event-ID` takes priority over `?since_seq=`, matching standard SSE
/// client reconnection behavior.
fn resume_point(headers: &HeaderMap, query_since: Option<u64>) -> Option<u64> {
    headers
        .get("last-event-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .or(query_since)
}

pub async fn logs_subscribe<C: Clock>(
    State(state): State<Arc<AppState<C>>>,
    Path(id): Path<String>,
    Query(query): Query<ResumeQuery>,
    headers: HeaderMap,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let id = devhost_core::SessionId::new(id);
    let ring = state
        .supervisor
        .ring(&id)
        .ok_or_else(|| ApiError(DevhostError::NotFound(format!("session {id}"))))?;

    let after = resume_point(&headers, query.since_seq);
    let rx = ring.subscribe_from(after);
    let stream = ReceiverStream::new(rx).map(|event| {
        let id = event.seq.to_string();
        let sse = if event.stream == LogStream::System {
            Event::default()
                .id(id)
                .event("gap")
                .json_data(&event)
                .unwrap_or_else(|_| Event::default().event("gap"))
        } else {
            Event::default()
                .id(id)
                .event("message")
                .json_data(&event)
                .unwrap_or_else(|_| Event::default().event("message"))
        };
        Ok(sse)
    });

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(state.sse_heartbeat)
            .text(""),
    ))
}

pub async fn status_subscribe<C: Clock>(
    State(state): State<Arc<AppState<C>>>,
    Query(query): Query<ResumeQuery>,
    headers: HeaderMap,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let after = resume_point(&headers, query.since_seq);
    let rx = state.supervisor.status_ring().subscribe_from(after);
    let stream = ReceiverStream::new(rx).map(|event: StatusEvent| {
        let id = event.seq.to_string();
        let sse = if event.gap.is_some() {
            Event::default()
                .id(id)
                .event("gap")
                .json_data(&event)
                .unwrap_or_else(|_| Event::default().event("gap"))
        } else {
            Event::default()
                .id(id)
                .event("message")
                .json_data(&event)
                .unwrap_or_else(|_| Event::default().event("message"))
        };
        Ok(sse)
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(state.sse_heartbeat).text(""))
}

// TODO: sse_write_deadline (SPEC_FULL.md §4.7) needs to cut a connection
// whose client socket is stalled on writes; axum's Router doesn't expose a
// per-write timeout for streaming bodies, so this would need a hyper
// connection-builder option in main.rs once one is available.
