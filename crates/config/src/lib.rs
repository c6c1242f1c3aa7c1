#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for secscan
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded, see [`constants`])
//! - Configuration file (`~/.config/secscan/config.toml` or `--config`)
//! - Environment variables (`SECSCAN_*`)
//! - CLI flags (applied by the binary last)

pub mod constants;

use constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_BIND, DEFAULT_BRANCH, DEFAULT_INTERVAL_SECS,
    DEFAULT_JITTER_SECS, DEFAULT_PORT, DEFAULT_REPOSITORY, DEFAULT_SYNC_TIMEOUT_SECS, ENV_PREFIX,
};
use secscan_errors::{ConfigError, Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub refresh: RefreshConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Where the advisory corpus comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_repository")]
    pub repository: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Local checkout; a temporary directory is used when unset
    #[serde(default)]
    pub checkout_dir: Option<PathBuf>,
}

/// Refresh cycle timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_interval")]
    pub interval: u64, // seconds
    #[serde(default = "default_jitter")]
    pub jitter: u64, // seconds
    #[serde(default = "default_sync_timeout")]
    pub sync_timeout: u64, // seconds
}

/// HTTP listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Optional statsd sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MetricsConfig {
    /// `host:port` of a statsd daemon; metrics are off when unset
    #[serde(default)]
    pub statsd: Option<String>,
    /// Prepended to every metric name, e.g. `secscan.`
    #[serde(default)]
    pub prefix: String,
}

// Default implementations

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            repository: default_repository(),
            branch: default_branch(),
            checkout_dir: None,
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL_SECS,
            jitter: DEFAULT_JITTER_SECS,
            sync_timeout: DEFAULT_SYNC_TIMEOUT_SECS,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: DEFAULT_PORT,
        }
    }
}

// Default value functions for serde
fn default_repository() -> String {
    DEFAULT_REPOSITORY.to_string()
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

fn default_interval() -> u64 {
    DEFAULT_INTERVAL_SECS
}

fn default_jitter() -> u64 {
    DEFAULT_JITTER_SECS
}

fn default_sync_timeout() -> u64 {
    DEFAULT_SYNC_TIMEOUT_SECS
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl RefreshConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    #[must_use]
    pub fn jitter(&self) -> Duration {
        Duration::from_secs(self.jitter)
    }

    #[must_use]
    pub fn sync_timeout(&self) -> Duration {
        Duration::from_secs(self.sync_timeout)
    }
}

impl ServerConfig {
    /// `bind:port` as accepted by `TcpListener::bind`
    #[must_use]
    pub fn address(&self) -> String {
        if self.bind.contains(':') && !self.bind.starts_with('[') {
            format!("[{}]:{}", self.bind, self.port)
        } else {
            format!("{}:{}", self.bind, self.port)
        }
    }
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded configuration file");
        Ok(config)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        match dirs::config_dir() {
            Some(dir) => {
                let config_path = dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);
                if config_path.exists() {
                    Self::load_from_file(&config_path).await
                } else {
                    Ok(Self::default())
                }
            }
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// If path is provided, loads from that file.
    /// If path is None, uses the default loading behavior.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        self.merge_from(|key| std::env::var(key).ok())
    }

    /// Merge values from an arbitrary `SECSCAN_*` lookup
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be parsed into the expected type.
    pub fn merge_from<F>(&mut self, lookup: F) -> Result<(), Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(dir) = var("GITDIR") {
            self.source.checkout_dir = Some(PathBuf::from(dir));
        }
        if let Some(repo) = var("REPO") {
            self.source.repository = repo;
        }
        if let Some(branch) = var("BRANCH") {
            self.source.branch = branch;
        }
        if let Some(bind) = var("BIND") {
            self.server.bind = bind;
        }
        if let Some(statsd) = var("STATSD") {
            self.metrics.statsd = (!statsd.is_empty()).then_some(statsd);
        }

        if let Some(port) = var("PORT") {
            self.server.port = parse_env("SECSCAN_PORT", port)?;
        }
        if let Some(interval) = var("INTERVAL") {
            self.refresh.interval = parse_env("SECSCAN_INTERVAL", interval)?;
        }
        if let Some(jitter) = var("JITTER") {
            self.refresh.jitter = parse_env("SECSCAN_JITTER", jitter)?;
        }
        if let Some(timeout) = var("SYNC_TIMEOUT") {
            self.refresh.sync_timeout = parse_env("SECSCAN_SYNC_TIMEOUT", timeout)?;
        }

        self.validate()
    }

    /// Reject values that would make the service unusable
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the offending field.
    pub fn validate(&self) -> Result<(), Error> {
        if self.refresh.interval == 0 {
            return Err(invalid("refresh.interval", "0"));
        }
        if self.refresh.sync_timeout == 0 {
            return Err(invalid("refresh.sync_timeout", "0"));
        }
        if self.source.repository.trim().is_empty() {
            return Err(invalid("source.repository", &self.source.repository));
        }
        if self.source.branch.trim().is_empty() {
            return Err(invalid("source.branch", &self.source.branch));
        }
        Ok(())
    }
}

fn parse_env<T: FromStr>(field: &str, value: String) -> Result<T, Error> {
    value.parse().map_err(|_| {
        ConfigError::InvalidValue {
            field: field.to_string(),
            value,
        }
        .into()
    })
}

fn invalid(field: &str, value: &str) -> Error {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
    .into()
}
