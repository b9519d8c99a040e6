// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use anyhow::Result;
use clap::Args;

use crate::client::{ClientError, DaemonClient};
use crate::output::{print_json, OutputFormat};

#[derive(Args, Debug)]
pub struct StopArgs {
    /// Session id
    pub id: String,

    /// Skip graceful shutdown and signal the process directly
    #[arg(long)]
    pub force: bool,
}

pub async fn run(client: &DaemonClient, args: StopArgs, format: OutputFormat) -> Result<()> {
    let resp = client
        .stop(&args.id, args.force)
        .await
        .map_err(ClientError::into_anyhow)?;

    match format {
        OutputFormat::Json => print_json(&resp)?,
        OutputFormat::Text => println!("{}: {:?}", args.id, resp.state),
    }
    Ok(())
}
