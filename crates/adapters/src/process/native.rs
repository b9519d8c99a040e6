// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Native subprocess backend for the Process Adapter.
//!
//! Each child is placed in its own process group (`process_group(0)`) so a
//! signal sent to `-pid` reaches the whole tree the dev server spawned, not
//! just the direct child — mirroring how the tmux adapter this crate used
//! to ship isolated each pane's process tree.

use std::os::unix::process::CommandExt as _;
use std::process::Stdio;

use async_trait::async_trait;
use devhost_core::SpawnError;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};

use super::{CapturedLine, ExitStatus, ProcessAdapter, ProcessHandle, SpawnSpec, Stream};

const MAX_LINE_BYTES: usize = 64 * 1024;
const OUTPUT_CHANNEL_CAPACITY: usize = 256;

#[derive(Clone, Default)]
pub struct NativeAdapter;

impl NativeAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessAdapter for NativeAdapter {
    async fn spawn(&self, spec: &SpawnSpec) -> Result<ProcessHandle, SpawnError> {
        if !spec.cwd.exists() {
            return Err(SpawnError::CwdMissing(spec.cwd.display().to_string()));
        }

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .current_dir(&spec.cwd)
            .envs(&spec.env)
            .process_group(0)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null())
            .kill_on_drop(false);

        let mut child = cmd.spawn().map_err(|e| classify_spawn_error(&spec.program, e))?;
        let pid = child.id().ok_or_else(|| {
            SpawnError::ResourceExhausted("spawned child has no pid".to_string())
        })?;

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

        tokio::spawn(async move {
            let status = child.wait().await;
            let exit = match status {
                Ok(status) => ExitStatus {
                    code: status.code(),
                    signal: unix_signal(&status),
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
        send_signal(pid, Signal::SIGTERM)
    }

    async fn force_kill(&self, pid: u32) -> Result<(), SpawnError> {
        send_signal(pid, Signal::SIGKILL)
    }

    async fn is_alive(&self, pid: u32) -> bool {
        kill(Pid::from_raw(pid as i32), None).is_ok()
    }
}

fn send_signal(pid: u32, signal: Signal) -> Result<(), SpawnError> {
    // Negative pid targets the whole process group.
    kill(Pid::from_raw(-(pid as i32)), signal)
        .map_err(|e| SpawnError::ResourceExhausted(format!("signal {signal} failed: {e}")))
}

fn classify_spawn_error(program: &str, e: std::io::Error) -> SpawnError {
    match e.kind() {
        std::io::ErrorKind::NotFound => SpawnError::ExecutableNotFound(program.to_string()),
        std::io::ErrorKind::PermissionDenied => SpawnError::PermissionDenied(program.to_string()),
        _ => SpawnError::ResourceExhausted(e.to_string()),
    }
}

#[cfg(unix)]
fn unix_signal(status: &std::process::ExitStatus) -> Option<i32> {
    std::os::unix::process::ExitStatusExt::signal(status)
}

#[cfg(not(unix))]
fn unix_signal(_status: &std::process::ExitStatus) -> Option<i32> {
    None
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
#[path = "native_tests.rs"]
mod tests;
