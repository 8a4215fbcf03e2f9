//! Typed configuration from environment variables.
//!
//! Loads once at startup and fails fast on malformed values. Everything has a
//! default, so an empty environment yields a single-worker server on port 5000.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
const DEFAULT_SERVICES_FILE: &str = "services.toml";
const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 3600;
const DEFAULT_RETENTION_WARN: usize = 10_000;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub services_file: PathBuf,
    /// Number of dispatch workers. 1 gives strict serial dispatch.
    pub workers: usize,
    pub backend_timeout: Duration,
    /// Task count at which the store logs a growth warning. None disables it.
    pub retention_warn_threshold: Option<usize>,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = lookup("ORCH_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| Error::Config(format!("ORCH_BIND_ADDR: {e}")))?;

        let workers = parse_var(&lookup, "ORCH_WORKERS", 1usize)?;
        if workers == 0 {
            return Err(Error::Config("ORCH_WORKERS must be at least 1".to_string()));
        }

        let timeout_secs = parse_var(
            &lookup,
            "ORCH_BACKEND_TIMEOUT_SECS",
            DEFAULT_BACKEND_TIMEOUT_SECS,
        )?;
        if timeout_secs == 0 {
            return Err(Error::Config(
                "ORCH_BACKEND_TIMEOUT_SECS must be positive".to_string(),
            ));
        }

        let retention = parse_var(&lookup, "ORCH_RETENTION_WARN", DEFAULT_RETENTION_WARN)?;

        Ok(Self {
            bind_addr,
            services_file: lookup("ORCH_SERVICES_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SERVICES_FILE)),
            workers,
            backend_timeout: Duration::from_secs(timeout_secs),
            retention_warn_threshold: (retention > 0).then_some(retention),
            otel_endpoint: lookup("OTEL_ENDPOINT").filter(|s| !s.is_empty()),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("{name}={raw}: {e}"))),
        None => Ok(default),
    }
}
