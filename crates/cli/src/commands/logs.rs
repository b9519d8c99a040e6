// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use anyhow::Result;
use clap::Args;

use crate::client::{ClientError, DaemonClient};
use crate::output::{print_json, OutputFormat};

#[derive(Args, Debug)]
pub struct LogsArgs {
    /// Session id
    pub id: String,

    /// Number of trailing lines to show
    #[arg(long, default_value_t = 200)]
    pub limit: usize,

    /// Stream new lines as they arrive, via the session's SSE log stream
    #[arg(long)]
    pub follow: bool,
}

pub async fn run(client: &DaemonClient, args: LogsArgs, format: OutputFormat) -> Result<()> {
    let resp = client
        .logs_tail(&args.id, Some(args.limit))
        .await
        .map_err(ClientError::into_anyhow)?;

    match format {
        OutputFormat::Json => print_json(&resp)?,
        OutputFormat::Text => {
            for event in &resp.events {
                println!("{}", event.line);
            }
        }
    }

    if args.follow {
        if matches!(format, OutputFormat::Json) {
            eprintln!("warning: --follow is not supported with --output json");
            return Ok(());
        }
        client
            .follow_logs(&args.id, resp.latest_seq)
            .await
            .map_err(ClientError::into_anyhow)?;
    }

    Ok(())
}
