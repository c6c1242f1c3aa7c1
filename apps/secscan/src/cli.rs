//! Command line interface definition

use clap::{Args, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

/// secscan - check composer.lock files against known security advisories
#[derive(Parser)]
#[command(name = "secscan")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Check composer.lock files against known security advisories")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format (report on stdout, JSON logs on stderr)
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Advisory checkout directory (a temporary one is used if unset)
    #[arg(long, global = true, value_name = "PATH")]
    pub gitdir: Option<PathBuf>,

    /// Advisory repository URL
    #[arg(long, global = true, value_name = "URL")]
    pub repo: Option<String>,

    /// Advisory repository branch
    #[arg(long, global = true, value_name = "NAME")]
    pub branch: Option<String>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Check a composer.lock file once and exit (1 if vulnerable)
    Check {
        /// Path to composer.lock
        lockfile: PathBuf,
    },

    /// Serve checks over HTTP, refreshing the advisories periodically
    Serve(ServeArgs),
}

/// Arguments of the `serve` command
#[derive(Args, Default)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<IpAddr>,

    /// Port to listen on
    #[arg(long, short)]
    pub port: Option<u16>,

    /// Seconds between advisory refreshes
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u64>,

    /// Maximum random seconds added to every refresh interval
    #[arg(long, value_name = "SECS")]
    pub jitter: Option<u64>,

    /// statsd daemon to send metrics to
    #[arg(long, value_name = "HOST:PORT")]
    pub statsd: Option<String>,
}
