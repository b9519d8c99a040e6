// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness for the top-level integration suite: an in-process
//! Control Plane bound to an ephemeral loopback port, backed by a real
//! [`Supervisor`] over a [`FakeProcessAdapter`] (SPEC_FULL.md §8 — "a thin
//! top-level integration suite exercising the HTTP surface end-to-end
//! against an in-process server bound to an ephemeral loopback port").
//!
//! No `devhostd`/`devhost` binary is spawned; the daemon's HTTP router is
//! built in-process so tests get deterministic control over process
//! lifetime (via [`FakeProcessAdapter`]) without the flakiness of real
//! child processes.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use devhost_adapters::{FakeProcessAdapter, ProcessAdapter};
use devhost_core::SystemClock;
use devhost_daemon::http::{self, AppState};
use devhost_daemon::{PortRegistry, Supervisor};
use serde_json::Value;

pub struct ServerConfig {
    pub log_ring_capacity: usize,
    pub shutdown_deadline: Duration,
    pub ready_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_ring_capacity: 10_000,
            shutdown_deadline: Duration::from_secs(5),
            ready_grace: Duration::from_secs(2),
        }
    }
}

/// One in-process devhostd instance: a real [`Supervisor`] wired to the
/// real axum `Router`, listening on loopback behind an OS-assigned port.
pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    pub fake: FakeProcessAdapter,
    pub supervisor: Arc<Supervisor<SystemClock>>,
}

impl TestServer {
    /// Start a server over a fresh, empty data dir.
    pub async fn start(config: ServerConfig) -> (Self, tempfile::TempDir) {
        let tmp = tempfile::tempdir().expect("tempdir");
        let server = Self::spawn(tmp.path(), config).await;
        (server, tmp)
    }

    /// Start a server over an existing data dir, as if devhostd had
    /// restarted: reconciles the persisted catalog and brings every
    /// remembered session's actor back up dormant (S6).
    pub async fn spawn(data_dir: &Path, config: ServerConfig) -> Self {
        let data_dir: PathBuf = data_dir.to_path_buf();
        let ports = Arc::new(PortRegistry::load(&data_dir).expect("load port registry"));
        let fake = FakeProcessAdapter::new();
        let native: Arc<dyn ProcessAdapter> = Arc::new(fake.clone());
        let container: Arc<dyn ProcessAdapter> = Arc::new(fake.clone());

        let supervisor = Arc::new(
            Supervisor::new(
                data_dir,
                SystemClock,
                native,
                container,
                ports,
                config.log_ring_capacity,
                config.shutdown_deadline,
                config.ready_grace,
            )
            .expect("construct supervisor"),
        );
        supervisor
            .reconcile_on_startup()
            .expect("reconcile on startup");
        supervisor.spawn_dormant_actors();

        let state = Arc::new(AppState {
            supervisor: Arc::clone(&supervisor),
            started_at: Instant::now(),
            version: "test",
            sse_heartbeat: Duration::from_secs(15),
            sse_write_deadline: Duration::from_secs(5),
            operation_deadline: Duration::from_secs(5),
        });

        let app = http::router(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local_addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{addr}"),
            client: reqwest::Client::new(),
            fake,
            supervisor,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST `/v1/sessions` and return the parsed envelope.
    pub async fn start_session(&self, body: Value) -> Value {
        self.client
            .post(self.url("/v1/sessions"))
            .json(&body)
            .send()
            .await
            .expect("POST /v1/sessions")
            .json()
            .await
            .expect("decode envelope")
    }

    pub async fn get_session(&self, id: &str) -> Value {
        self.client
            .get(self.url(&format!("/v1/sessions/{id}")))
            .send()
            .await
            .expect("GET session")
            .json()
            .await
            .expect("decode envelope")
    }

    pub async fn stop_session(&self, id: &str, force: bool) -> (reqwest::StatusCode, Value) {
        let resp = self
            .client
            .delete(self.url(&format!("/v1/sessions/{id}")))
            .json(&serde_json::json!({ "force": force }))
            .send()
            .await
            .expect("DELETE session");
        let status = resp.status();
        (status, resp.json().await.expect("decode envelope"))
    }

    pub async fn list_sessions(&self) -> Value {
        self.client
            .get(self.url("/v1/sessions"))
            .send()
            .await
            .expect("GET /v1/sessions")
            .json()
            .await
            .expect("decode envelope")
    }

    /// Poll `GET /v1/sessions/{id}` until `result.state == want`, or panic
    /// once `timeout` elapses.
    pub async fn wait_for_state(&self, id: &str, want: &str, timeout: Duration) -> Value {
        let deadline = Instant::now() + timeout;
        loop {
            let envelope = self.get_session(id).await;
            if let Some(state) = envelope["result"]["state"].as_str() {
                if state == want {
                    return envelope;
                }
            }
            if Instant::now() >= deadline {
                panic!(
                    "session {id} did not reach state {want:?} within {timeout:?}; last seen: {envelope}"
                );
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

/// Bind a listener on `port` and keep accepting (and immediately dropping)
/// connections for the rest of the process, so the Session Supervisor's TCP
/// readiness probe (SPEC_FULL.md §4.4) observes the session's port as "up" —
/// standing in for the real dev server the fake process would otherwise
/// have bound, since `FakeProcessAdapter` never opens a socket itself.
pub async fn fake_listen(port: u16) {
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .unwrap_or_else(|e| panic!("bind fake readiness listener on {port}: {e}"));
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok(_) => continue,
                Err(_) => break,
            }
        }
    });
}

pub fn node_command() -> Value {
    serde_json::json!({ "program": "node", "args": ["server.js"] })
}
