//! secscan - check composer.lock files against PHP security advisories
//!
//! `check` syncs the advisory corpus once, answers a single lock file and
//! exits. `serve` keeps the database fresh in the background and answers
//! lock files over HTTP.

mod cli;
mod display;
mod error;
mod events;
mod logging;
mod metrics;
mod server;

use crate::cli::{Cli, Commands, GlobalArgs, ServeArgs};
use crate::display::OutputRenderer;
use crate::error::CliError;
use crate::events::EventHandler;
use clap::Parser;
use secscan_config::Config;
use secscan_events::{EventEmitter, EventSender, GeneralEvent};
use secscan_source::{DirectorySource, GitSynchronizer, Synchronizer};
use secscan_types::ComposerLock;
use secscan_vulndb::{DatabaseHandle, QueryEngine, RefreshOutcome, RefreshScheduler};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::watch;
use tracing::{error, info};

/// Exit status when the lock file has known vulnerabilities
const EXIT_VULNERABLE: i32 = 1;
/// Exit status for every other failure
const EXIT_ERROR: i32 = 2;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug);

    match run(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("Application error: {}", e);
            if !json_mode {
                eprintln!("Error: {e}");
            }
            process::exit(EXIT_ERROR);
        }
    }
}

/// Main application logic, returns the process exit code
async fn run(cli: Cli) -> Result<i32, CliError> {
    info!("Starting secscan v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration with proper precedence:
    // 1. Start with file config (or defaults)
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;

    // 2. Merge environment variables
    config.merge_env()?;

    // 3. Apply CLI flags (highest precedence)
    apply_cli_config(&mut config, &cli.global, &cli.command);
    config.validate()?;

    // Create event channel and its consumer
    let (event_sender, event_receiver) = secscan_events::channel();
    if let (Commands::Serve(_), Some(remote)) = (&cli.command, &config.metrics.statsd) {
        install_statsd(remote, &config, &event_sender);
    }
    let event_pump = EventHandler::new().spawn(event_receiver);

    event_sender.emit(secscan_events::AppEvent::General(
        GeneralEvent::ConfigurationLoaded {
            sources: config_sources(&cli.global),
            warnings: Vec::new(),
        },
    ));

    // The temporary checkout, if any, lives until the command returns
    let (checkout, _tempdir) = checkout_dir(&config)?;

    let result = match cli.command {
        Commands::Check { lockfile } => {
            run_check(&config, &checkout, &lockfile, cli.global.json, event_sender).await
        }
        Commands::Serve(_) => run_serve(&config, &checkout, event_sender).await,
    };

    // Every sender is gone once the command returns; wait for the log to flush
    let _ = event_pump.await;
    result
}

/// Sync once, check `lockfile` and print the report
async fn run_check(
    config: &Config,
    checkout: &Path,
    lockfile: &Path,
    json: bool,
    events: EventSender,
) -> Result<i32, CliError> {
    let bytes = tokio::fs::read(lockfile)
        .await
        .map_err(|e| CliError::Lockfile {
            path: lockfile.to_path_buf(),
            message: e.to_string(),
        })?;
    let lock = ComposerLock::from_slice(&bytes).map_err(|e| CliError::Lockfile {
        path: lockfile.to_path_buf(),
        message: e.to_string(),
    })?;

    let scheduler = build_scheduler(config, checkout, events.clone());
    if let RefreshOutcome::Failed { error, .. } = scheduler.refresh_once().await {
        return Err(error.into());
    }

    let engine = QueryEngine::new(scheduler.handle().clone()).with_events(events);
    let report = engine.check(lock.items());
    OutputRenderer::new(json).render_report(&report)?;

    Ok(if report.vulnerable { EXIT_VULNERABLE } else { 0 })
}

/// Refresh in the background and serve HTTP until SIGINT or SIGTERM
async fn run_serve(config: &Config, checkout: &Path, events: EventSender) -> Result<i32, CliError> {
    let address = config.server.address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|e| CliError::Server(format!("cannot listen on {address}: {e}")))?;

    let scheduler = Arc::new(build_scheduler(config, checkout, events.clone()));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);

    let refresh_loop = {
        let scheduler = Arc::clone(&scheduler);
        let shutdown = shutdown_rx.clone();
        tokio::spawn(async move { scheduler.run(shutdown).await })
    };

    let state = server::AppState::new(
        QueryEngine::new(scheduler.handle().clone()).with_events(events.clone()),
    )
    .with_events(events);

    let signal_tx = Arc::clone(&shutdown_tx);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received");
        let _ = signal_tx.send(true);
    });

    let mut server_shutdown = shutdown_rx;
    let served = server::serve(listener, state, async move {
        let _ = server_shutdown.wait_for(|stop| *stop).await;
    })
    .await;

    // The server may also stop on its own; the refresh loop follows it
    let _ = shutdown_tx.send(true);
    let _ = refresh_loop.await;
    drop(scheduler);
    served.map_err(|e| CliError::Server(e.to_string()))?;
    Ok(0)
}

fn build_scheduler(config: &Config, checkout: &Path, events: EventSender) -> RefreshScheduler {
    let synchronizer = GitSynchronizer::new(
        config.source.repository.clone(),
        config.source.branch.clone(),
        checkout,
    );
    let source = DirectorySource::new(synchronizer.root());
    RefreshScheduler::new(
        Arc::new(synchronizer),
        Arc::new(source),
        DatabaseHandle::new(),
        (&config.refresh).into(),
    )
    .with_events(events)
}

/// Configured checkout directory, or a temporary one removed on drop
fn checkout_dir(config: &Config) -> Result<(PathBuf, Option<TempDir>), CliError> {
    if let Some(dir) = &config.source.checkout_dir {
        return Ok((dir.clone(), None));
    }
    let tempdir = tempfile::Builder::new().prefix("secscan-").tempdir()?;
    // The synchronizer clones into a directory that does not exist yet
    let checkout = tempdir.path().join("advisories");
    Ok((checkout, Some(tempdir)))
}

fn install_statsd(remote: &str, config: &Config, events: &EventSender) {
    match crate::metrics::install_statsd(remote, &config.metrics.prefix) {
        Ok(()) => info!(%remote, "sending metrics to statsd"),
        Err(e) => events.emit_warning_with_context(
            format!("statsd disabled for {remote}"),
            e.to_string(),
        ),
    }
}

fn config_sources(global: &GlobalArgs) -> Vec<String> {
    let mut sources = vec!["defaults".to_string()];
    if let Some(path) = &global.config {
        sources.push(path.display().to_string());
    } else if let Ok(path) = Config::default_path() {
        if path.exists() {
            sources.push(path.display().to_string());
        }
    }
    sources.push("environment".to_string());
    sources.push("command line".to_string());
    sources
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

/// Initialize tracing/logging
fn init_tracing(json_mode: bool, debug_enabled: bool) {
    let default_filter = if debug_enabled {
        "info,secscan=debug,secscan_vulndb=debug,secscan_source=debug"
    } else {
        "info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    if json_mode {
        // JSON mode: stdout carries the report, logs go to stderr
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    }
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(config: &mut Config, global: &GlobalArgs, command: &Commands) {
    if let Some(gitdir) = &global.gitdir {
        config.source.checkout_dir = Some(gitdir.clone());
    }
    if let Some(repo) = &global.repo {
        config.source.repository.clone_from(repo);
    }
    if let Some(branch) = &global.branch {
        config.source.branch.clone_from(branch);
    }

    if let Commands::Serve(ServeArgs {
        bind,
        port,
        interval,
        jitter,
        statsd,
    }) = command
    {
        if let Some(bind) = bind {
            config.server.bind = bind.to_string();
        }
        if let Some(port) = port {
            config.server.port = *port;
        }
        if let Some(interval) = interval {
            config.refresh.interval = *interval;
        }
        if let Some(jitter) = jitter {
            config.refresh.jitter = *jitter;
        }
        if let Some(statsd) = statsd {
            config.metrics.statsd = Some(statsd.clone());
        }
    }
}
