// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use anyhow::Result;

use crate::client::{ClientError, DaemonClient};
use crate::output::{print_json, OutputFormat};

pub async fn run(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let resp = client.health().await.map_err(ClientError::into_anyhow)?;

    match format {
        OutputFormat::Json => print_json(&resp)?,
        OutputFormat::Text => println!(
            "ok  devhostd {}  {} sessions  uptime {}s",
            resp.version, resp.session_count, resp.uptime_s
        ),
    }
    Ok(())
}
