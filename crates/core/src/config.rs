// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment-driven configuration (SPEC_FULL.md §4.7). Loaded once at
//! daemon startup into an immutable value; nothing below the daemon
//! entrypoint reads the environment directly.

use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to determine data directory; set DEVHOST_DATA_DIR")]
    NoDataDir,
    #[error("invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub bind_addr: IpAddr,
    pub bind_port: u16,
    pub shutdown_deadline: Duration,
    pub ready_grace: Duration,
    pub log_ring_capacity: usize,
    pub log_retention_grace: Duration,
    pub sse_write_deadline: Duration,
    pub sse_heartbeat: Duration,
    pub operation_deadline: Duration,
}

impl Config {
    /// Load configuration from the environment, falling back to the
    /// documented defaults (SPEC_FULL.md §4.7) for anything unset.
    pub fn load() -> Result<Self, ConfigError> {
        let data_dir = match std::env::var("DEVHOST_DATA_DIR") {
            Ok(v) => PathBuf::from(v),
            Err(_) => dirs::data_dir()
                .map(|d| d.join("devhost"))
                .ok_or(ConfigError::NoDataDir)?,
        };

        Ok(Self {
            data_dir,
            bind_addr: env_parse("DEVHOST_BIND_ADDR", IpAddr::from([127, 0, 0, 1]))?,
            bind_port: env_parse("DEVHOST_BIND_PORT", 8081u16)?,
            shutdown_deadline: env_parse_ms("DEVHOST_SHUTDOWN_DEADLINE_MS", 10_000)?,
            ready_grace: env_parse_ms("DEVHOST_READY_GRACE_MS", 3_000)?,
            log_ring_capacity: env_parse("DEVHOST_LOG_RING_CAPACITY", 10_000usize)?,
            log_retention_grace: env_parse_ms("DEVHOST_LOG_RETENTION_GRACE_MS", 900_000)?,
            sse_write_deadline: env_parse_ms("DEVHOST_SSE_WRITE_DEADLINE_MS", 5_000)?,
            sse_heartbeat: env_parse_ms("DEVHOST_SSE_HEARTBEAT_MS", 15_000)?,
            operation_deadline: env_parse_ms("DEVHOST_OPERATION_DEADLINE_MS", 30_000)?,
        })
    }
}

fn env_parse<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Err(_) => Ok(default),
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
    }
}

fn env_parse_ms(var: &'static str, default_ms: u64) -> Result<Duration, ConfigError> {
    let ms: u64 = env_parse(var, default_ms)?;
    Ok(Duration::from_millis(ms))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
