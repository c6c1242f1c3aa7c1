//! Built-in defaults for every configurable value

/// Public advisory corpus used when no repository is configured
pub const DEFAULT_REPOSITORY: &str = "https://github.com/FriendsOfPHP/security-advisories.git";
pub const DEFAULT_BRANCH: &str = "master";

pub const DEFAULT_INTERVAL_SECS: u64 = 600;
pub const DEFAULT_JITTER_SECS: u64 = 0;
pub const DEFAULT_SYNC_TIMEOUT_SECS: u64 = 120;

pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

/// Directory under the platform config dir holding `config.toml`
pub const CONFIG_DIR_NAME: &str = "secscan";
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Prefix of every environment variable read by [`crate::Config::merge_env`]
pub const ENV_PREFIX: &str = "SECSCAN_";
