// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use anyhow::Result;
use clap::Args;

use crate::client::{ClientError, DaemonClient};
use crate::output::{print_json, OutputFormat};

#[derive(Args, Debug)]
pub struct RestartArgs {
    /// Session id
    pub id: String,
}

pub async fn run(client: &DaemonClient, args: RestartArgs, format: OutputFormat) -> Result<()> {
    let resp = client.restart(&args.id).await.map_err(ClientError::into_anyhow)?;

    match format {
        OutputFormat::Json => print_json(&resp)?,
        OutputFormat::Text => println!(
            "{}: {:?} (pid: {})",
            args.id,
            resp.state,
            resp.pid.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string())
        ),
    }
    Ok(())
}
