// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use anyhow::Result;
use clap::{Args, ValueEnum};
use devhost_core::Command as SessionCommand;

use crate::client::{DaemonClient, PortField, StartRequest};
use crate::exit_error::user_error;
use crate::output::{print_json, OutputFormat};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum RuntimeClassArg {
    Node,
    Python,
    Php,
    Static,
    Generic,
}

impl From<RuntimeClassArg> for devhost_core::RuntimeClass {
    fn from(v: RuntimeClassArg) -> Self {
        match v {
            RuntimeClassArg::Node => Self::Node,
            RuntimeClassArg::Python => Self::Python,
            RuntimeClassArg::Php => Self::Php,
            RuntimeClassArg::Static => Self::Static,
            RuntimeClassArg::Generic => Self::Generic,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum RestartPolicyArg {
    Never,
    OnCrash,
    Always,
}

impl From<RestartPolicyArg> for devhost_core::RestartPolicy {
    fn from(v: RestartPolicyArg) -> Self {
        match v {
            RestartPolicyArg::Never => Self::Never,
            RestartPolicyArg::OnCrash => Self::OnCrash,
            RestartPolicyArg::Always => Self::Always,
        }
    }
}

#[derive(Args, Debug)]
pub struct StartArgs {
    /// Human-readable label for the session
    #[arg(long)]
    pub name: Option<String>,

    /// Working directory the server runs in (defaults to the current directory)
    #[arg(long)]
    pub cwd: Option<String>,

    /// Fixed port to request; omit to auto-allocate from the runtime class's range
    #[arg(long)]
    pub port: Option<u16>,

    /// Environment variables to set, repeatable: --env KEY=VALUE
    #[arg(long = "env", value_parser = parse_key_value)]
    pub env: Vec<(String, String)>,

    /// Runtime class, selects the default port range
    #[arg(long, value_enum, default_value = "generic")]
    pub runtime: RuntimeClassArg,

    /// Restart policy on process exit
    #[arg(long, value_enum, default_value = "never")]
    pub restart: RestartPolicyArg,

    /// The command to run, e.g. `devhost start -- npm run dev`
    #[arg(last = true, required = true)]
    pub command: Vec<String>,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) => Ok((k.to_string(), v.to_string())),
        None => Err(format!("expected KEY=VALUE, got {s:?}")),
    }
}

pub async fn run(client: &DaemonClient, args: StartArgs, format: OutputFormat) -> Result<()> {
    let (program, rest) = args
        .command
        .split_first()
        .ok_or_else(|| user_error("no command given"))?;

    let req = StartRequest {
        name: args.name,
        command: SessionCommand {
            program: program.clone(),
            args: rest.to_vec(),
        },
        cwd: args.cwd,
        port: args.port.map(PortField::Fixed),
        env: args.env.into_iter().collect(),
        runtime_class: Some(args.runtime.into()),
        restart_policy: Some(args.restart.into()),
    };

    let resp = client
        .start(&req)
        .await
        .map_err(crate::client::ClientError::into_anyhow)?;

    match format {
        OutputFormat::Json => print_json(&resp)?,
        OutputFormat::Text => {
            println!(
                "started {} (state: {:?}, port: {})",
                resp.session_id,
                resp.state,
                resp.port
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "-".to_string())
            );
        }
    }
    Ok(())
}
