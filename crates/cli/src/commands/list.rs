// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use anyhow::Result;
use clap::Args;

use crate::client::{ClientError, DaemonClient};
use crate::output::{format_time_ago, print_json, OutputFormat};
use crate::table::{Column, Table};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only show sessions in this state (starting, running, stopping, stopped, failed, crashed)
    #[arg(long)]
    pub state: Option<String>,
}

pub async fn run(client: &DaemonClient, args: ListArgs, format: OutputFormat) -> Result<()> {
    let resp = client
        .list(args.state.as_deref())
        .await
        .map_err(ClientError::into_anyhow)?;

    match format {
        OutputFormat::Json => print_json(&resp)?,
        OutputFormat::Text => {
            let mut table = Table::new(vec![
                Column::left("ID"),
                Column::left("NAME"),
                Column::status("STATE"),
                Column::right("PORT"),
                Column::right("PID"),
                Column::muted("AGE"),
            ]);
            for session in &resp.sessions {
                table.row(vec![
                    session.id.short(12).to_string(),
                    session.name.clone(),
                    format!("{:?}", session.state).to_lowercase(),
                    session
                        .port
                        .map(|p| p.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    session
                        .pid
                        .map(|p| p.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    format_time_ago(session.state_changed_at),
                ]);
            }
            let mut out = std::io::stdout();
            table.render(&mut out);
            if resp.sessions.is_empty() {
                println!("no sessions");
            }
        }
    }
    Ok(())
}
