// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! devhostd — the local development-host supervisor daemon.
//!
//! Owns the Session Supervisor (C4) and serves the Control Plane (C5) over
//! loopback HTTP+SSE. Started and stopped by the `devhost` CLI; not meant to
//! be run under a process supervisor of its own (systemd, etc.) — it is a
//! per-user background process, not a system service.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::sync::Arc;
use std::time::Instant;

use devhost_adapters::{ContainerAdapter, NativeAdapter, ProcessAdapter};
use devhost_core::{Config, SystemClock};
use devhost_daemon::http::{self, AppState};
use devhost_daemon::{PortRegistry, Supervisor};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("devhostd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("devhostd {}", env!("CARGO_PKG_VERSION"));
                println!("Local development-host supervisor daemon");
                println!();
                println!("USAGE:");
                println!("    devhostd");
                println!();
                println!("devhostd is typically started by the `devhost` CLI and should not");
                println!("be invoked directly. It listens on loopback HTTP for commands.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: devhostd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;
    let log_path = config.data_dir.join("daemon.log");

    rotate_log_if_needed(&log_path);
    write_startup_marker(&log_path)?;
    let _log_guard = setup_logging(&log_path)?;

    info!("starting devhostd");

    std::fs::create_dir_all(&config.data_dir)?;

    let ports = Arc::new(PortRegistry::load(&config.data_dir)?);
    let native: Arc<dyn ProcessAdapter> = Arc::new(NativeAdapter::new());
    let container: Arc<dyn ProcessAdapter> = Arc::new(ContainerAdapter::new());

    let supervisor = Arc::new(Supervisor::new(
        config.data_dir.clone(),
        SystemClock,
        native,
        container,
        ports,
        config.log_ring_capacity,
        config.shutdown_deadline,
        config.ready_grace,
    )?);

    supervisor.reconcile_on_startup()?;
    supervisor.spawn_dormant_actors();

    let state = Arc::new(AppState {
        supervisor: Arc::clone(&supervisor),
        started_at: Instant::now(),
        version: env!("CARGO_PKG_VERSION"),
        sse_heartbeat: config.sse_heartbeat,
        sse_write_deadline: config.sse_write_deadline,
        operation_deadline: config.operation_deadline,
    });

    let app = http::router(state);
    let addr = std::net::SocketAddr::new(config.bind_addr, config.bind_port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(%bound_addr, "devhostd ready, listening");
    println!("READY {bound_addr}");

    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                error!("http server exited with error: {}", e);
            }
        }
        _ = sigterm.recv() => {
            info!("received SIGTERM, shutting down");
        }
        _ = sigint.recv() => {
            info!("received SIGINT, shutting down");
        }
    }

    info!("devhostd stopped");
    Ok(())
}

const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the daemon log file if it exceeds [`MAX_LOG_SIZE`]. Best-effort:
/// rotation failures are silently ignored so the daemon still starts.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };

    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

/// Startup marker prefix written to log before anything else; the CLI uses
/// this to find where the current startup attempt begins.
const STARTUP_MARKER_PREFIX: &str = "--- devhostd: starting (pid: ";

fn write_startup_marker(log_path: &std::path::Path) -> Result<(), std::io::Error> {
    use std::io::Write;

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;
    writeln!(
        file,
        "{}{}) ---\n",
        STARTUP_MARKER_PREFIX,
        std::process::id()
    )?;

    Ok(())
}

fn setup_logging(
    log_path: &std::path::Path,
) -> Result<tracing_appender::non_blocking::WorkerGuard, std::io::Error> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let parent = log_path
        .parent()
        .ok_or_else(|| std::io::Error::other("log path has no parent directory"))?;
    std::fs::create_dir_all(parent)?;

    let file_name = log_path
        .file_name()
        .ok_or_else(|| std::io::Error::other("log path has no file name"))?;
    let file_appender = tracing_appender::rolling::never(parent, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
