// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container backend for the Process Adapter: shells out to the `docker`
//! CLI the same way this crate's native backend shells directly to the
//! kernel — one uniform trait, two spawn strategies.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use devhost_core::SpawnError;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};

use super::{CapturedLine, ExitStatus, ProcessAdapter, ProcessHandle, SpawnSpec, Stream};

const MAX_LINE_BYTES: usize = 64 * 1024;
const OUTPUT_CHANNEL_CAPACITY: usize = 256;

/// Runs sessions as `docker run` containers.
///
/// `ProcessHandle::pid` is the container's init pid as seen from the host
/// namespace (via `docker inspect`), so callers keep treating it as an
/// ordinary pid; this adapter keeps a pid→container-name map internally to
/// translate back for `docker stop`/`docker kill`.
#[derive(Clone, Default)]
pub struct ContainerAdapter {
    binary: String,
    names: Arc<Mutex<HashMap<u32, String>>>,
}

impl ContainerAdapter {
    pub fn new() -> Self {
        Self {
            binary: "docker".to_string(),
            names: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn container_name(spec: &SpawnSpec) -> String {
        format!(
            "devhost-{}",
            spec.port
                .map(|p| p.to_string())
                .unwrap_or_else(|| spec.program.replace('/', "-"))
        )
    }

    fn name_for(&self, pid: u32) -> Option<String> {
        self.names.lock().get(&pid).cloned()
    }
}

#[async_trait]
impl ProcessAdapter for ContainerAdapter {
    async fn spawn(&self, spec: &SpawnSpec) -> Result<ProcessHandle, SpawnError> {
        let image = spec
            .container_image
            .clone()
            .ok_or_else(|| SpawnError::ResourceExhausted("no container_image set".to_string()))?;

        if !spec.cwd.exists() {
            return Err(SpawnError::CwdMissing(spec.cwd.display().to_string()));
        }

        let name = Self::container_name(spec);
        let _ = Command::new(&self.binary)
            .args(["rm", "-f", &name])
            .output()
            .await;

        let mut cmd = Command::new(&self.binary);
        cmd.args(["run", "--name", &name, "-i"])
            .arg("-v")
            .arg(format!("{}:/workspace", spec.cwd.display()))
            .arg("-w")
            .arg("/workspace");

        for (key, value) in &spec.env {
            cmd.arg("-e").arg(format!("{key}={value}"));
        }
        if let Some(port) = spec.port {
            cmd.arg("-p").arg(format!("{port}:{port}"));
        }

        cmd.arg(&image).arg(&spec.program).args(&spec.args);
        cmd.stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .stdin(std::process::Stdio::null());

        let mut child = cmd
            .spawn()
            .map_err(|e| SpawnError::ResourceExhausted(format!("docker run failed: {e}")))?;

        let pid = container_init_pid(&self.binary, &name)
            .await
            .unwrap_or(0);
        self.names.lock().insert(pid, name.clone());

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (output_tx, output_rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        let (exit_tx, exit_rx) = oneshot::channel();

        if let Some(stdout) = stdout {
            spawn_line_reader(stdout, Stream::Stdout, output_tx.clone());
        }
        if let Some(stderr) = stderr {
            spawn_line_reader(stderr, Stream::Stderr, output_tx.clone());
        }
        drop(output_tx);

        let names = Arc::clone(&self.names);
        tokio::spawn(async move {
            let status = child.wait().await;
            names.lock().remove(&pid);
            let exit = match status {
                Ok(status) => ExitStatus {
                    code: status.code(),
                    signal: None,
                },
                Err(_) => ExitStatus {
                    code: None,
                    signal: None,
                },
            };
            let _ = exit_tx.send(exit);
        });

        Ok(ProcessHandle {
            pid,
            output: output_rx,
            exit: exit_rx,
        })
    }

    async fn signal(&self, pid: u32) -> Result<(), SpawnError> {
        let Some(name) = self.name_for(pid) else {
            return Ok(()); // already reaped
        };
        run_docker(&self.binary, &["stop", "--time", "1", &name]).await
    }

    async fn force_kill(&self, pid: u32) -> Result<(), SpawnError> {
        let Some(name) = self.name_for(pid) else {
            return Ok(());
        };
        run_docker(&self.binary, &["kill", &name]).await
    }

    async fn is_alive(&self, pid: u32) -> bool {
        self.name_for(pid).is_some()
    }
}

async fn container_init_pid(binary: &str, name: &str) -> Option<u32> {
    let mut cmd = Command::new(binary);
    cmd.args(["inspect", "-f", "{{.State.Pid}}", name]);
    let output = crate::subprocess::run_with_timeout(
        cmd,
        crate::subprocess::CONTAINER_CMD_TIMEOUT,
        "docker inspect",
    )
    .await
    .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout).trim().parse().ok()
}

async fn run_docker(binary: &str, args: &[&str]) -> Result<(), SpawnError> {
    let mut cmd = Command::new(binary);
    cmd.args(args);
    let output = crate::subprocess::run_with_timeout(
        cmd,
        crate::subprocess::CONTAINER_CMD_TIMEOUT,
        &format!("docker {args:?}"),
    )
    .await
    .map_err(|e| SpawnError::ResourceExhausted(e))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::warn!(?args, %stderr, "docker command did not succeed");
    }
    Ok(())
}

fn spawn_line_reader<R>(reader: R, stream: Stream, tx: mpsc::Sender<CapturedLine>)
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).split(b'\n');
        loop {
            match lines.next_segment().await {
                Ok(Some(mut bytes)) => {
                    let truncated = bytes.len() > MAX_LINE_BYTES;
                    bytes.truncate(MAX_LINE_BYTES);
                    if tx
                        .send(CapturedLine {
                            stream,
                            bytes,
                            truncated,
                        })
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
                Ok(None) => return,
                Err(_) => return,
            }
        }
    });
}

#[cfg(test)]
#[path = "container_tests.rs"]
mod tests;
