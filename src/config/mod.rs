//! Typed configuration from environment variables.
//!
//! Loaded once at startup; a missing or unparsable variable fails fast.

use crate::error::{Error, Result};
use secrecy::SecretString;
use std::time::Duration;

#[derive(Debug)]
pub struct Config {
    pub database_url: SecretString,
    /// pgmq queue carrying control notifications.
    pub control_queue: String,
    /// Endpoint identity; scopes the listener's log span.
    pub endpoint_name: String,
    /// Cap on distinct workers admitted. `None` admits everyone.
    pub max_workers: Option<usize>,
    pub poll_interval: Duration,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: SecretString::from(required_var("DATABASE_URL")?),
            control_queue: var_or("CONTROL_QUEUE", "readyq_control"),
            endpoint_name: var_or("ENDPOINT_NAME", "readyq"),
            max_workers: parsed_var("MAX_WORKERS")?,
            poll_interval: Duration::from_millis(parsed_var("POLL_INTERVAL_MS")?.unwrap_or(500)),
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: var_or("LOG_LEVEL", "info"),
        })
    }
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| Error::Config(format!("required environment variable {name} is not set")))
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed_var<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("{name}={raw:?} is invalid: {e}"))),
        Err(_) => Ok(None),
    }
}
