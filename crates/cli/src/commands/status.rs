// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use anyhow::Result;
use clap::Args;

use crate::client::{ClientError, DaemonClient};
use crate::color;
use crate::output::{format_time_ago, print_json, OutputFormat};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Session id
    pub id: String,
}

pub async fn run(client: &DaemonClient, args: StatusArgs, format: OutputFormat) -> Result<()> {
    let session = client.get(&args.id).await.map_err(ClientError::into_anyhow)?;

    match format {
        OutputFormat::Json => print_json(&session)?,
        OutputFormat::Text => {
            let state = format!("{:?}", session.state).to_lowercase();
            println!("{}  {}", color::header(&session.id.to_string()), session.name);
            println!("  state:   {}", color::status(&state));
            println!(
                "  port:    {}",
                session
                    .port
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "-".to_string())
            );
            println!(
                "  pid:     {}",
                session
                    .pid
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "-".to_string())
            );
            println!("  command: {} {}", session.command.program, session.command.args.join(" "));
            println!("  cwd:     {}", session.cwd);
            println!(
                "  updated: {} ago",
                format_time_ago(session.state_changed_at)
            );
            if let Some(exit) = &session.exit {
                println!("  exit:    {}", exit.exit_reason);
            }
            if session.restart_count > 0 {
                println!("  restarts: {}", session.restart_count);
            }
        }
    }
    Ok(())
}
