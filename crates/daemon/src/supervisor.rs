// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session Supervisor (C4, SPEC_FULL.md §4.4): one actor task per managed
//! session, composing the Process Adapter (C3), the Log Ring (C2), and the
//! Port Registry (C1) into the session lifecycle state machine.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use devhost_adapters::{
    CapturedLine, ProcessAdapter, ProcessHandle, SpawnSpec, Stream as AdapterStream,
};
use devhost_core::id::IdGen;
use devhost_core::{
    Backend, Clock, Command, DevhostError, ExitInfo, RestartConfig, RestartPolicy, RuntimeClass,
    Session, SessionId, SessionState, SpawnError, SystemClock, UuidIdGen,
};
use devhost_storage::SessionCatalogStore;
use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot};

use crate::log_ring::LogRing;
use crate::port_registry::PortRegistry;
use crate::status_ring::StatusRing;

/// Request to create a new managed session.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub name: String,
    pub command: Command,
    pub cwd: String,
    pub env: HashMap<String, String>,
    pub runtime_class: RuntimeClass,
    pub backend: Backend,
    pub container_image: Option<String>,
    pub requested_port: Option<u16>,
    pub restart: RestartConfig,
}

enum ActorCommand {
    Stop {
        deadline: Duration,
        reply: oneshot::Sender<Result<(), DevhostError>>,
    },
    Restart {
        reply: oneshot::Sender<Result<(), DevhostError>>,
    },
}

/// What the actor loop should do after one spawned process's lifetime ends.
enum LifetimeOutcome {
    /// A manual stop request was served; the actor goes dormant, keeping the
    /// session record visible until a restart or an explicit delete.
    StopForGood,
    /// A manual restart request was served; respawn immediately, bypassing
    /// the session's restart policy and backoff.
    ManualRestart,
    /// The process exited or crashed on its own; consult the restart policy.
    ExitedMaybeRestart,
    /// The readiness probe never succeeded within `ready_grace`; terminal,
    /// same as a spawn failure — not eligible for the restart policy.
    ReadyTimeout,
}

/// Race a TCP readiness probe against `deadline` (SPEC_FULL.md §4.4: Starting
/// → Running requires the process alive and either a successful probe or the
/// grace window elapsing). Sessions with no assigned port are considered
/// ready once spawned, since there is nothing to probe.
async fn probe_until_ready(port: Option<u16>, deadline: Duration) -> bool {
    const PROBE_INTERVAL: Duration = Duration::from_millis(200);

    let Some(port) = port else {
        return true;
    };

    let deadline_at = tokio::time::Instant::now() + deadline;
    loop {
        let connected = tokio::time::timeout(
            devhost_adapters::subprocess::HEALTH_PROBE_TIMEOUT,
            tokio::net::TcpStream::connect(("127.0.0.1", port)),
        )
        .await;
        if matches!(connected, Ok(Ok(_))) {
            return true;
        }
        let now = tokio::time::Instant::now();
        if now >= deadline_at {
            return false;
        }
        tokio::time::sleep(PROBE_INTERVAL.min(deadline_at - now)).await;
    }
}

struct SessionEntry<C: Clock> {
    session: RwLock<Session>,
    ring: Arc<LogRing<C>>,
    cmd_tx: mpsc::Sender<ActorCommand>,
}

/// Owns every managed session and the shared C1/C2 state they draw on.
pub struct Supervisor<C: Clock = SystemClock> {
    data_dir: PathBuf,
    clock: C,
    native: Arc<dyn ProcessAdapter>,
    container: Arc<dyn ProcessAdapter>,
    ports: Arc<PortRegistry>,
    catalog: SessionCatalogStore,
    log_ring_capacity: usize,
    shutdown_deadline: Duration,
    ready_grace: Duration,
    sessions: RwLock<HashMap<SessionId, Arc<SessionEntry<C>>>>,
    id_gen: UuidIdGen,
    status: Arc<StatusRing<C>>,
}

impl<C: Clock> Supervisor<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        data_dir: PathBuf,
        clock: C,
        native: Arc<dyn ProcessAdapter>,
        container: Arc<dyn ProcessAdapter>,
        ports: Arc<PortRegistry>,
        log_ring_capacity: usize,
        shutdown_deadline: Duration,
        ready_grace: Duration,
    ) -> Result<Self, devhost_storage::SnapshotError> {
        let catalog = SessionCatalogStore::new(&data_dir);
        let status = Arc::new(StatusRing::new(clock.clone()));
        Ok(Self {
            data_dir,
            clock,
            status,
            native,
            container,
            ports,
            catalog,
            log_ring_capacity,
            shutdown_deadline,
            ready_grace,
            sessions: RwLock::new(HashMap::new()),
            id_gen: UuidIdGen,
        })
    }

    /// Reconcile on startup: every session the catalog remembers as
    /// non-terminal had its process die with the daemon, since no child
    /// survives a daemon restart. Mark them `Crashed` and release their
    /// ports; terminal sessions are left as recorded.
    pub fn reconcile_on_startup(&self) -> Result<(), devhost_storage::SnapshotError> {
        let mut state = self.catalog.load()?;
        let mut changed = false;
        for session in state.sessions.values_mut() {
            if !session.state.is_terminal() {
                session.state = SessionState::Crashed;
                session.state_changed_at = self.clock.now();
                session.exit = Some(ExitInfo {
                    exit_code: None,
                    exit_signal: None,
                    exit_reason: "daemon restarted; process not recovered".to_string(),
                });
                self.ports.release(&session.id);
                changed = true;
            }
        }
        if changed {
            self.catalog.save(&state)?;
        }
        Ok(())
    }

    /// Spin up a dormant actor for every session the catalog remembers, so
    /// that `restart_session` can bring a reconciled `Crashed` session back
    /// without a fresh `start_session` call. Call once, after
    /// `reconcile_on_startup`, from a context that can hold `&Arc<Self>`.
    pub fn spawn_dormant_actors(self: &Arc<Self>) {
        let state = match self.catalog.load() {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!(error = %err, "failed to load catalog for dormant actor spawn");
                return;
            }
        };

        for session in state.sessions.into_values() {
            let id = session.id.clone();
            let backend = session.backend;
            let ring = Arc::new(LogRing::new(self.log_ring_capacity, self.clock.clone()));
            let (cmd_tx, cmd_rx) = mpsc::channel(16);
            let entry = Arc::new(SessionEntry {
                session: RwLock::new(session),
                ring,
                cmd_tx,
            });

            self.sessions.write().insert(id.clone(), entry.clone());

            let adapter = self.adapter_for(backend);
            let sup = self.clone();
            tokio::spawn(async move {
                sup.run_actor(id, entry, adapter, cmd_rx, true).await;
            });
        }
    }

    fn adapter_for(&self, backend: Backend) -> Arc<dyn ProcessAdapter> {
        match backend {
            Backend::Native => self.native.clone(),
            Backend::Container => self.container.clone(),
        }
    }

    pub async fn start_session(self: &Arc<Self>, req: NewSession) -> Result<SessionId, DevhostError> {
        if req.backend == Backend::Container && req.container_image.is_none() {
            return Err(DevhostError::InvalidParams(
                "container_image is required when backend is container".to_string(),
            ));
        }

        let id = SessionId::new(self.id_gen.next());
        let port = self
            .ports
            .allocate(&id, req.runtime_class, req.requested_port)
            .map_err(DevhostError::from)?;

        let now = self.clock.now();
        let session = Session {
            id: id.clone(),
            name: req.name,
            command: req.command,
            cwd: req.cwd,
            env: req.env,
            runtime_class: req.runtime_class,
            backend: req.backend,
            container_image: req.container_image,
            port: Some(port),
            pid: None,
            state: SessionState::Starting,
            exit: None,
            started_at: None,
            state_changed_at: now,
            restart: req.restart,
            restart_count: 0,
            last_restart_at: None,
        };

        let ring = Arc::new(LogRing::new(self.log_ring_capacity, self.clock.clone()));
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let entry = Arc::new(SessionEntry {
            session: RwLock::new(session.clone()),
            ring: ring.clone(),
            cmd_tx,
        });
        self.sessions.write().insert(id.clone(), entry.clone());
        self.persist_session(&session)?;

        let adapter = self.adapter_for(req.backend);
        let sup = self.clone();
        let actor_id = id.clone();
        tokio::spawn(async move {
            sup.run_actor(actor_id, entry, adapter, cmd_rx, false).await;
        });

        Ok(id)
    }

    fn persist_session(&self, session: &Session) -> Result<(), DevhostError> {
        let mut state = self
            .catalog
            .load()
            .map_err(|e| DevhostError::Internal(e.to_string()))?;
        state.upsert(session.clone());
        self.catalog
            .save(&state)
            .map_err(|e| DevhostError::Internal(e.to_string()))?;
        self.status.publish(session.clone());
        Ok(())
    }

    pub fn get(&self, id: &SessionId) -> Option<Session> {
        self.sessions.read().get(id).map(|e| e.session.read().clone())
    }

    pub fn list(&self) -> Vec<Session> {
        self.sessions
            .read()
            .values()
            .map(|e| e.session.read().clone())
            .collect()
    }

    pub fn ring(&self, id: &SessionId) -> Option<Arc<LogRing<C>>> {
        self.sessions.read().get(id).map(|e| e.ring.clone())
    }

    /// The shared port registry, for Control Plane error-detail enrichment
    /// (e.g. naming the session already holding a conflicting port).
    pub fn ports(&self) -> &Arc<PortRegistry> {
        &self.ports
    }

    pub fn data_dir(&self) -> &std::path::Path {
        &self.data_dir
    }

    /// The supervisor-wide status transition stream, for `/v1/events/stream`.
    pub fn status_ring(&self) -> &Arc<StatusRing<C>> {
        &self.status
    }

    /// Remove a terminal session's record for good. Non-terminal sessions
    /// must be stopped first (SPEC_FULL.md §4.4): destruction requires a
    /// terminal state plus this explicit call, never `stop` alone.
    pub fn delete_session(&self, id: &SessionId) -> Result<(), DevhostError> {
        let session = self
            .get(id)
            .ok_or_else(|| DevhostError::NotFound(format!("session {id}")))?;
        if !session.state.is_terminal() {
            return Err(DevhostError::Conflict(format!(
                "session {id} is not in a terminal state"
            )));
        }

        // Dropping the map entry drops the last sender side of the actor's
        // command channel (request-handler callers only ever hold short-lived
        // clones), which is what lets the dormant actor task observe
        // channel closure and exit.
        self.sessions.write().remove(id);

        let mut catalog = self
            .catalog
            .load()
            .map_err(|e| DevhostError::Internal(e.to_string()))?;
        catalog.remove(id);
        self.catalog
            .save(&catalog)
            .map_err(|e| DevhostError::Internal(e.to_string()))
    }

    pub async fn stop_session(&self, id: &SessionId, force: bool) -> Result<(), DevhostError> {
        let entry = self
            .sessions
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| DevhostError::NotFound(format!("session {id}")))?;

        if entry.session.read().state.is_terminal() {
            return Ok(());
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        let deadline = if force {
            Duration::from_millis(0)
        } else {
            self.shutdown_deadline
        };
        entry
            .cmd_tx
            .send(ActorCommand::Stop {
                deadline,
                reply: reply_tx,
            })
            .await
            .map_err(|_| DevhostError::Internal("session actor unavailable".to_string()))?;
        reply_rx
            .await
            .map_err(|_| DevhostError::Internal("session actor dropped reply".to_string()))?
    }

    pub async fn restart_session(&self, id: &SessionId) -> Result<(), DevhostError> {
        let entry = self
            .sessions
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| DevhostError::NotFound(format!("session {id}")))?;

        let (reply_tx, reply_rx) = oneshot::channel();
        entry
            .cmd_tx
            .send(ActorCommand::Restart { reply: reply_tx })
            .await
            .map_err(|_| DevhostError::Internal("session actor unavailable".to_string()))?;
        reply_rx
            .await
            .map_err(|_| DevhostError::Internal("session actor dropped reply".to_string()))?
    }

    async fn run_actor(
        self: Arc<Self>,
        id: SessionId,
        entry: Arc<SessionEntry<C>>,
        adapter: Arc<dyn ProcessAdapter>,
        mut cmd_rx: mpsc::Receiver<ActorCommand>,
        mut dormant: bool,
    ) {
        // The actor never truly exits except when its command channel is
        // closed, which only happens when `delete_session` drops the last
        // `Arc<SessionEntry>` holding the sender. A terminal session simply
        // sits dormant, visible in the catalog, until a manual restart or an
        // explicit delete — matching the documented lifecycle where `stop`
        // alone never destroys a session record.
        loop {
            if dormant {
                match cmd_rx.recv().await {
                    Some(ActorCommand::Restart { reply }) => {
                        let _ = reply.send(Ok(()));
                        dormant = false;
                    }
                    Some(ActorCommand::Stop { reply, .. }) => {
                        let _ = reply.send(Ok(()));
                    }
                    None => break,
                }
                continue;
            }

            let spec = {
                let session = entry.session.read().clone();
                SpawnSpec {
                    program: session.command.program.clone(),
                    args: session.command.args.clone(),
                    cwd: PathBuf::from(&session.cwd),
                    env: session.env.clone(),
                    container_image: session.container_image.clone(),
                    port: session.port,
                }
            };

            let port = spec.port;
            let spawned = adapter.spawn(&spec).await;
            let handle = match spawned {
                Ok(handle) => handle,
                Err(err) => {
                    self.transition_failed(&entry, err);
                    self.ports.release(&id);
                    dormant = true;
                    continue;
                }
            };

            match self
                .drive_one_lifetime(&id, &entry, &adapter, handle, port, &mut cmd_rx)
                .await
            {
                LifetimeOutcome::StopForGood | LifetimeOutcome::ReadyTimeout => {
                    self.ports.release(&id);
                    dormant = true;
                }
                LifetimeOutcome::ManualRestart => continue,
                LifetimeOutcome::ExitedMaybeRestart => {
                    if self.should_restart(&entry) {
                        self.apply_backoff(&entry).await;
                    } else {
                        self.fail_exhausted(&entry);
                        self.ports.release(&id);
                        dormant = true;
                    }
                }
            }
        }

        self.ports.release(&id);
        self.sessions.write().remove(&id);
    }

    /// Drive one spawned process from launch to exit or stop request.
    async fn drive_one_lifetime(
        &self,
        id: &SessionId,
        entry: &Arc<SessionEntry<C>>,
        adapter: &Arc<dyn ProcessAdapter>,
        mut handle: ProcessHandle,
        port: Option<u16>,
        cmd_rx: &mut mpsc::Receiver<ActorCommand>,
    ) -> LifetimeOutcome {
        let pid = handle.pid;
        {
            let mut session = entry.session.write();
            session.pid = Some(pid);
            session.state = SessionState::Starting;
            session.started_at = Some(self.clock.now());
            session.state_changed_at = self.clock.now();
        }
        self.persist_locked(entry);

        let probe = probe_until_ready(port, self.ready_grace);
        tokio::pin!(probe);
        let mut became_running = false;
        let mut output_open = true;

        loop {
            tokio::select! {
                biased;

                line = handle.output.recv(), if output_open => {
                    match line {
                        Some(captured) => self.record_line(entry, captured),
                        None => output_open = false,
                    }
                }

                ready = &mut probe, if !became_running => {
                    became_running = true;
                    if ready {
                        let mut session = entry.session.write();
                        if session.state == SessionState::Starting {
                            session.state = SessionState::Running;
                            session.state_changed_at = self.clock.now();
                        }
                        drop(session);
                        self.persist_locked(entry);
                    } else {
                        let _ = self.stop_process(entry, adapter, &mut handle, self.shutdown_deadline).await;
                        let mut session = entry.session.write();
                        session.state = SessionState::Failed;
                        session.state_changed_at = self.clock.now();
                        session.exit = Some(ExitInfo {
                            exit_code: None,
                            exit_signal: None,
                            exit_reason: "readiness probe did not succeed within ready_grace".to_string(),
                        });
                        drop(session);
                        self.persist_locked(entry);
                        entry.ring.push_system(format!("session {id} failed readiness probe"));
                        return LifetimeOutcome::ReadyTimeout;
                    }
                }

                exit = &mut handle.exit => {
                    let exit = exit.unwrap_or(devhost_adapters::ExitStatus { code: None, signal: None });
                    let crashed = exit.code != Some(0);
                    let mut session = entry.session.write();
                    session.state = if crashed { SessionState::Crashed } else { SessionState::Stopped };
                    session.state_changed_at = self.clock.now();
                    session.pid = None;
                    session.exit = Some(ExitInfo {
                        exit_code: exit.code,
                        exit_signal: exit.signal,
                        exit_reason: if crashed { "process exited with error".to_string() } else { "process exited".to_string() },
                    });
                    drop(session);
                    self.persist_locked(entry);
                    entry.ring.push_system(format!("session {id} process exited (pid {pid})"));
                    return LifetimeOutcome::ExitedMaybeRestart;
                }

                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(ActorCommand::Stop { deadline, reply }) => {
                            let result = self.stop_process(entry, adapter, &mut handle, deadline).await;
                            let _ = reply.send(result);
                            return LifetimeOutcome::StopForGood;
                        }
                        Some(ActorCommand::Restart { reply }) => {
                            let result = self.stop_process(entry, adapter, &mut handle, self.shutdown_deadline).await;
                            let _ = reply.send(result);
                            return LifetimeOutcome::ManualRestart;
                        }
                        None => return LifetimeOutcome::StopForGood,
                    }
                }
            }
        }
    }

    fn record_line(&self, entry: &Arc<SessionEntry<C>>, captured: CapturedLine) {
        let stream = match captured.stream {
            AdapterStream::Stdout => devhost_core::LogStream::Stdout,
            AdapterStream::Stderr => devhost_core::LogStream::Stderr,
        };
        let line = String::from_utf8_lossy(&captured.bytes).into_owned();
        entry.ring.push_line(stream, line, captured.truncated);
    }

    async fn stop_process(
        &self,
        entry: &Arc<SessionEntry<C>>,
        adapter: &Arc<dyn ProcessAdapter>,
        handle: &mut ProcessHandle,
        deadline: Duration,
    ) -> Result<(), DevhostError> {
        {
            let mut session = entry.session.write();
            session.state = SessionState::Stopping;
            session.state_changed_at = self.clock.now();
        }
        self.persist_locked(entry);

        adapter
            .signal(handle.pid)
            .await
            .map_err(DevhostError::from)?;

        if deadline.is_zero() {
            adapter.force_kill(handle.pid).await.map_err(DevhostError::from)?;
            return Ok(());
        }

        match tokio::time::timeout(deadline, &mut handle.exit).await {
            Ok(_) => Ok(()),
            Err(_elapsed) => adapter
                .force_kill(handle.pid)
                .await
                .map_err(DevhostError::from),
        }
    }

    fn transition_failed(&self, entry: &Arc<SessionEntry<C>>, err: SpawnError) {
        let mut session = entry.session.write();
        session.state = SessionState::Failed;
        session.state_changed_at = self.clock.now();
        session.exit = Some(ExitInfo {
            exit_code: None,
            exit_signal: None,
            exit_reason: err.to_string(),
        });
        drop(session);
        self.persist_locked(entry);
    }

    /// The restart policy has been exhausted (`restart_count == max_restarts`):
    /// the session moves from `Crashed` to terminal `Failed` (SPEC_FULL.md
    /// §4.4: "policy exhausted -> Failed").
    fn fail_exhausted(&self, entry: &Arc<SessionEntry<C>>) {
        let mut session = entry.session.write();
        session.state = SessionState::Failed;
        session.state_changed_at = self.clock.now();
        session.exit = Some(ExitInfo {
            exit_code: session.exit.as_ref().and_then(|e| e.exit_code),
            exit_signal: session.exit.as_ref().and_then(|e| e.exit_signal),
            exit_reason: "restart policy exhausted".to_string(),
        });
        drop(session);
        self.persist_locked(entry);
    }

    fn should_restart(&self, entry: &Arc<SessionEntry<C>>) -> bool {
        let session = entry.session.read();
        match session.restart.policy {
            RestartPolicy::Never => false,
            RestartPolicy::OnCrash => {
                session.state == SessionState::Crashed && session.restart_count < session.restart.max_restarts
            }
            RestartPolicy::Always => session.restart_count < session.restart.max_restarts,
        }
    }

    async fn apply_backoff(&self, entry: &Arc<SessionEntry<C>>) {
        const MAX_BACKOFF_MS: u64 = 60_000;
        let backoff_ms = {
            let mut session = entry.session.write();
            session.restart_count += 1;
            session.last_restart_at = Some(self.clock.now());
            session
                .restart
                .backoff_initial_ms
                .saturating_mul(1u64 << (session.restart_count - 1).min(32))
                .min(MAX_BACKOFF_MS)
        };
        self.persist_locked(entry);
        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
    }

    fn persist_locked(&self, entry: &Arc<SessionEntry<C>>) {
        let session = entry.session.read().clone();
        if let Err(err) = self.persist_session(&session) {
            tracing::warn!(error = %err, session_id = %session.id, "failed to persist session state");
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
