//! Application settings and configuration
//!
//! This module provides configuration management for the poller binary,
//! loading settings from environment variables with sensible defaults.

use crate::consul::{parse_endpoints, ClientOptions, Endpoint};
use crate::source::PollerConfig;
use crate::utils::TimeoutConfig;
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::time::Duration;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[value(alias = "text")]
    Pretty,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Json => write!(f, "json"),
            LogFormat::Pretty => write!(f, "pretty"),
        }
    }
}

impl Default for LogFormat {
    fn default() -> Self {
        LogFormat::Json
    }
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            _ => anyhow::bail!("Invalid log format: {}. Expected: json or pretty", s),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    // App settings
    pub app_name: String,
    pub app_version: String,
    pub log_level: String,
    pub log_format: LogFormat,

    // Consul settings
    /// Comma-separated `host[:port]` list, empty for the local agent
    pub hosts: String,
    pub facility: String,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub datacenter: Option<String>,
    pub discover_peers: bool,

    // Polling
    pub poll_initial_delay_ms: u64,
    pub poll_interval_ms: u64,

    // Transport deadlines
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Settings {
    /// Load settings from environment variables and validate them
    pub fn load() -> Result<Self> {
        let settings = Self::from_env()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read settings from environment variables with defaults, unvalidated
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let defaults = TimeoutConfig::default();

        Ok(Self {
            app_name: env_or_default("APP_NAME", "consul-config-source"),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: env_or_default("LOG_LEVEL", "info"),
            log_format: env_or_default("LOG_FORMAT", "json")
                .parse::<LogFormat>()
                .context("Invalid LOG_FORMAT value")?,

            hosts: env_or_default("CONSUL_HOSTS", ""),
            facility: env_or_default("CONSUL_FACILITY", ""),
            token: non_empty_var("CONSUL_TOKEN"),
            datacenter: non_empty_var("CONSUL_DATACENTER"),
            discover_peers: parse_flag(&env_or_default("CONSUL_DISCOVER_PEERS", "true"))
                .context("Invalid CONSUL_DISCOVER_PEERS value")?,

            poll_initial_delay_ms: env_or_default("POLL_INITIAL_DELAY_MS", "0")
                .parse()
                .context("Invalid POLL_INITIAL_DELAY_MS value")?,
            poll_interval_ms: env_or_default("POLL_INTERVAL_MS", "30000")
                .parse()
                .context("Invalid POLL_INTERVAL_MS value")?,

            connect_timeout_secs: env::var("CONSUL_CONNECT_TIMEOUT_SECS")
                .ok()
                .map(|v| v.parse::<u64>().context("Invalid CONSUL_CONNECT_TIMEOUT_SECS value"))
                .transpose()?
                .unwrap_or(defaults.connect_timeout.as_secs()),
            request_timeout_secs: env::var("CONSUL_REQUEST_TIMEOUT_SECS")
                .ok()
                .map(|v| v.parse::<u64>().context("Invalid CONSUL_REQUEST_TIMEOUT_SECS value"))
                .transpose()?
                .unwrap_or(defaults.request_timeout.as_secs()),
        })
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if self.facility.trim().is_empty() {
            anyhow::bail!("CONSUL_FACILITY must be set");
        }

        if self.poll_interval_ms == 0 {
            anyhow::bail!("Poll interval must be > 0");
        }

        if self.connect_timeout_secs == 0 || self.request_timeout_secs == 0 {
            anyhow::bail!("Consul timeouts must be > 0");
        }

        self.endpoints().context("Invalid CONSUL_HOSTS value")?;

        if self.hosts.trim().is_empty() {
            tracing::warn!("No Consul hosts configured, using the local agent");
        }

        Ok(())
    }

    /// Parsed endpoint list, empty for the local agent
    pub fn endpoints(&self) -> Result<Vec<Endpoint>> {
        Ok(parse_endpoints(&self.hosts)?)
    }

    pub fn timeout_config(&self) -> TimeoutConfig {
        TimeoutConfig::new()
            .with_connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs))
    }

    /// Options for every Consul client the binary builds
    pub fn client_options(&self) -> ClientOptions {
        let mut options = ClientOptions::new().with_timeouts(self.timeout_config());
        if let Some(token) = &self.token {
            options = options.with_token(token);
        }
        if let Some(datacenter) = &self.datacenter {
            options = options.with_datacenter(datacenter);
        }
        options
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig::new(Duration::from_millis(self.poll_interval_ms))
            .with_initial_delay(Duration::from_millis(self.poll_initial_delay_ms))
    }
}

impl Default for Settings {
    fn default() -> Self {
        let timeouts = TimeoutConfig::default();
        Self {
            app_name: "consul-config-source".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
            hosts: String::new(),
            facility: String::new(),
            token: None,
            datacenter: None,
            discover_peers: true,
            poll_initial_delay_ms: 0,
            poll_interval_ms: 30_000,
            connect_timeout_secs: timeouts.connect_timeout.as_secs(),
            request_timeout_secs: timeouts.request_timeout.as_secs(),
        }
    }
}

/// Helper function to get environment variable with default
fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a boolean switch, accepting the usual spellings of on and off
fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("Invalid flag: {}. Expected: true or false", value),
    }
}
