// src/config.rs

//! Manages server configuration: loading, defaulting, and validation.

use crate::core::protocol::MAX_BUF_SIZE;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;
use tracing::warn;

/// Who is treated as an administrator by the built-in identity store.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct AuthConfig {
    /// Names that sign in with the root mode. Everyone else signs in as a user.
    #[serde(default)]
    pub root_names: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MetricsConfig {
    /// If true, an HTTP server will be started to expose Prometheus metrics.
    #[serde(default)]
    pub enabled: bool,
    /// The port for the Prometheus metrics server.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

fn default_metrics_port() -> u16 {
    8878
}

fn default_name() -> String {
    "zcli".to_string()
}
fn default_address() -> String {
    "127.0.0.1:4000".to_string()
}
fn default_buf_size() -> usize {
    crate::core::protocol::DEFAULT_BUF_SIZE
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_max_clients() -> usize {
    1024
}

/// The main configuration struct for the server.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    /// The program name shown in usage text and prompts.
    #[serde(default = "default_name")]
    pub name: String,
    /// `host:port` for TCP, or a filesystem path ending in `.sock` for a local socket.
    #[serde(default = "default_address")]
    pub address: String,
    /// The chunk size announced to every client during the handshake.
    #[serde(default = "default_buf_size")]
    pub buf_size: usize,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_max_clients")]
    pub max_clients: usize,
    /// Closes sessions that stay silent this long. Absent means never.
    #[serde(default, with = "humantime_serde")]
    pub idle_timeout: Option<Duration>,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: default_name(),
            address: default_address(),
            buf_size: default_buf_size(),
            log_level: default_log_level(),
            max_clients: default_max_clients(),
            idle_timeout: None,
            auth: AuthConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Config {
    /// Loads and validates the configuration from a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        Self::from_toml(&contents).with_context(|| format!("Invalid config file '{path}'"))
    }

    /// Parses and validates a TOML document.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration to ensure logical consistency.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(anyhow!("name cannot be empty"));
        }
        if self.name.contains(char::is_whitespace) {
            return Err(anyhow!("name cannot contain whitespace"));
        }
        if self.address.trim().is_empty() {
            return Err(anyhow!("address cannot be empty"));
        }
        if self.buf_size == 0 || self.buf_size > MAX_BUF_SIZE {
            return Err(anyhow!(
                "buf_size must be between 1 and {MAX_BUF_SIZE}, got {}",
                self.buf_size
            ));
        }
        if self.max_clients == 0 {
            return Err(anyhow!("max_clients cannot be 0"));
        }
        if let Some(timeout) = self.idle_timeout
            && timeout.is_zero()
        {
            return Err(anyhow!("idle_timeout cannot be 0; omit it to disable"));
        }
        if self.buf_size < 16 {
            warn!(
                "very small buf_size setting: {} bytes. Every message will span many chunks.",
                self.buf_size
            );
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(anyhow!("metrics.port cannot be 0"));
        }

        Ok(())
    }
}
