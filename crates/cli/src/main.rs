// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! devhost — thin CLI client for devhostd's Control Plane.

mod client;
mod color;
mod commands;
mod exit_error;
mod output;
mod table;

use anyhow::Result;
use clap::{Parser, Subcommand};

use client::DaemonClient;
use commands::{health, list, logs, restart, start, status, stop};
use output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "devhost",
    version,
    about = "Launch, monitor, and tear down local development servers"
)]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value_t, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new session
    Start(start::StartArgs),
    /// Stop a session (graceful by default)
    Stop(stop::StopArgs),
    /// Restart a session, keeping its id and configuration
    Restart(restart::RestartArgs),
    /// Show one session's full status
    Status(status::StatusArgs),
    /// List all sessions
    List(list::ListArgs),
    /// Show (and optionally follow) a session's captured output
    Logs(logs::LogsArgs),
    /// Check whether devhostd is reachable
    Health,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let code = e
            .downcast_ref::<exit_error::ExitError>()
            .map_or(1, |c| c.code);
        let msg = format_error(&e);
        if !msg.is_empty() {
            eprintln!("Error: {msg}");
        }
        std::process::exit(code);
    }
}

/// Format an anyhow error, deduplicating the chain when the top-level
/// message already contains everything a cause would add.
fn format_error(err: &anyhow::Error) -> String {
    let top = err.to_string();
    let chain_redundant = err
        .chain()
        .skip(1)
        .all(|cause| top.contains(&cause.to_string()));

    if chain_redundant {
        return top;
    }

    let mut buf = top;
    for (i, cause) in err.chain().skip(1).enumerate() {
        buf.push_str(&format!("\n\nCaused by:\n    {i}: {cause}"));
    }
    buf
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let client = DaemonClient::new();

    match cli.command {
        Commands::Start(args) => start::run(&client, args, cli.output).await,
        Commands::Stop(args) => stop::run(&client, args, cli.output).await,
        Commands::Restart(args) => restart::run(&client, args, cli.output).await,
        Commands::Status(args) => status::run(&client, args, cli.output).await,
        Commands::List(args) => list::run(&client, args, cli.output).await,
        Commands::Logs(args) => logs::run(&client, args, cli.output).await,
        Commands::Health => health::run(&client, cli.output).await,
    }
}
