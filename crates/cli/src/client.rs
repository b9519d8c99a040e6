// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin HTTP+SSE client for the Control Plane (C5). Holds no daemon state
//! of its own — every command is a single request/response round trip, or
//! (for `logs --follow`/`events`) a long-lived SSE connection.

use std::collections::HashMap;
use std::time::Duration;

use devhost_core::{LogEvent, RestartPolicy, RuntimeClass, Session, SessionId};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

fn default_base_url() -> String {
    std::env::var("DEVHOST_URL").unwrap_or_else(|_| "http://127.0.0.1:8081".to_string())
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not reach devhostd at {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{0}")]
    Api(ApiErrorBody),

    #[error("unexpected response from devhostd: {0}")]
    Decode(#[from] reqwest::Error),
}

impl ClientError {
    /// Classify into the CLI's exit-code contract (spec.md §6: 1 user
    /// error, 2 system error) and attach this error's message as context.
    pub fn into_anyhow(self) -> anyhow::Error {
        let is_user_error = matches!(
            &self,
            ClientError::Api(body)
                if matches!(
                    body.code.as_str(),
                    "NOT_FOUND" | "INVALID_PARAMS" | "CONFLICT" | "PORT_ERROR" | "SPAWN_ERROR"
                )
        );
        let message = self.to_string();
        if is_user_error {
            crate::exit_error::user_error(message)
        } else {
            crate::exit_error::system_error(message)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub details: serde_json::Value,
}

impl std::fmt::Display for ApiErrorBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: Option<T>,
    error: Option<ApiErrorBody>,
}

pub struct DaemonClient {
    base_url: String,
    http: reqwest::Client,
}

impl DaemonClient {
    pub fn new() -> Self {
        Self {
            base_url: default_base_url(),
            http: reqwest::Client::new(),
        }
    }

    async fn send<T: for<'de> Deserialize<'de>>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = builder
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|source| ClientError::Connect {
                url: self.base_url.clone(),
                source,
            })?;
        let envelope: Envelope<T> = response.json().await?;
        match (envelope.result, envelope.error) {
            (Some(result), _) => Ok(result),
            (None, Some(err)) => Err(ClientError::Api(err)),
            (None, None) => Err(ClientError::Api(ApiErrorBody {
                code: "INTERNAL_ERROR".to_string(),
                message: "empty response envelope".to_string(),
                details: serde_json::Value::Null,
            })),
        }
    }

    pub async fn start(&self, req: &StartRequest) -> Result<StartResponse, ClientError> {
        let url = format!("{}/v1/sessions", self.base_url);
        self.send(self.http.post(url).json(req)).await
    }

    pub async fn list(&self, state: Option<&str>) -> Result<ListResponse, ClientError> {
        let url = format!("{}/v1/sessions", self.base_url);
        let mut req = self.http.get(url);
        if let Some(state) = state {
            req = req.query(&[("state", state)]);
        }
        self.send(req).await
    }

    pub async fn get(&self, id: &str) -> Result<Session, ClientError> {
        let url = format!("{}/v1/sessions/{}", self.base_url, id);
        self.send(self.http.get(url)).await
    }

    pub async fn stop(&self, id: &str, force: bool) -> Result<DeleteResponse, ClientError> {
        let url = format!("{}/v1/sessions/{}", self.base_url, id);
        self.send(self.http.delete(url).json(&DeleteBody { force }))
            .await
    }

    pub async fn restart(&self, id: &str) -> Result<RestartResponse, ClientError> {
        let url = format!("{}/v1/sessions/{}/restart", self.base_url, id);
        self.send(self.http.post(url)).await
    }

    pub async fn logs_tail(
        &self,
        id: &str,
        limit: Option<usize>,
    ) -> Result<LogsResponse, ClientError> {
        let url = format!("{}/v1/sessions/{}/logs", self.base_url, id);
        let mut req = self.http.get(url);
        if let Some(limit) = limit {
            req = req.query(&[("limit", limit.to_string())]);
        }
        self.send(req).await
    }

    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let url = format!("{}/v1/health", self.base_url);
        self.send(self.http.get(url)).await
    }

    /// Open the session's SSE log stream and print each event as it arrives,
    /// until the connection closes or the caller's process is interrupted.
    pub async fn follow_logs(&self, id: &str, since_seq: Option<u64>) -> Result<(), ClientError> {
        let url = format!("{}/v1/sessions/{}/logs/stream", self.base_url, id);
        let mut req = self.http.get(url);
        if let Some(seq) = since_seq {
            req = req.query(&[("since_seq", seq.to_string())]);
        }
        let response = req
            .send()
            .await
            .map_err(|source| ClientError::Connect {
                url: self.base_url.clone(),
                source,
            })?;
        let mut stream = response.bytes_stream();
        let mut buf = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            buf.push_str(&String::from_utf8_lossy(&chunk));
            while let Some(pos) = buf.find("\n\n") {
                let frame = buf[..pos].to_string();
                buf.drain(..pos + 2);
                print_sse_log_frame(&frame);
            }
        }
        Ok(())
    }
}

impl Default for DaemonClient {
    fn default() -> Self {
        Self::new()
    }
}

fn print_sse_log_frame(frame: &str) {
    for line in frame.lines() {
        if let Some(data) = line.strip_prefix("data: ") {
            if let Ok(event) = serde_json::from_str::<LogEvent>(data) {
                println!("{}", event.line);
            }
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PortField {
    Fixed(u16),
    Auto(String),
}

#[derive(Debug, Serialize)]
pub struct StartRequest {
    pub name: Option<String>,
    pub command: devhost_core::Command,
    pub cwd: Option<String>,
    pub port: Option<PortField>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    pub runtime_class: Option<RuntimeClass>,
    pub restart_policy: Option<RestartPolicy>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartResponse {
    pub session_id: SessionId,
    pub port: Option<u16>,
    pub pid: Option<u32>,
    pub state: devhost_core::SessionState,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse {
    pub sessions: Vec<Session>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct DeleteBody {
    pub force: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub state: devhost_core::SessionState,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RestartResponse {
    pub state: devhost_core::SessionState,
    pub port: Option<u16>,
    pub pid: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogsResponse {
    pub events: Vec<LogEvent>,
    pub earliest_seq: Option<u64>,
    pub latest_seq: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub version: String,
    pub session_count: usize,
    pub uptime_s: u64,
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
