//! Refresh scheduler: sync, rebuild, publish
//!
//! One cycle brings the corpus up to date through the [`Synchronizer`],
//! builds a new database from the [`AdvisorySource`] on the blocking pool and
//! publishes it through the [`DatabaseHandle`]. A failure at any step leaves
//! the handle untouched and the next tick tries again.

use crate::builder::{build, BuiltDatabase};
use crate::handle::{DatabaseHandle, DatabaseSnapshot};
use secscan_errors::{Error, SyncError};
use secscan_events::{EventEmitter, EventSender, FailureContext, RefreshStage, VulnDbEvent};
use secscan_source::{AdvisorySource, Synchronizer};
use secscan_types::Fingerprint;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};

/// Timing of the refresh loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshConfig {
    /// Delay between the end of one cycle and the start of the next
    pub interval: Duration,
    /// Upper bound of the random delay added to every interval
    pub jitter: Duration,
    /// Deadline for a single synchronization
    pub sync_timeout: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        (&secscan_config::RefreshConfig::default()).into()
    }
}

impl From<&secscan_config::RefreshConfig> for RefreshConfig {
    fn from(config: &secscan_config::RefreshConfig) -> Self {
        Self {
            interval: config.interval(),
            jitter: config.jitter(),
            sync_timeout: config.sync_timeout(),
        }
    }
}

/// What a single refresh cycle did
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    /// A new database is live
    Published {
        fingerprint: Fingerprint,
        previous: Option<Fingerprint>,
        advisories: usize,
    },
    /// The cycle was abandoned; the previous database is still live
    Failed { stage: RefreshStage, error: Error },
    /// Another cycle was already running
    Skipped,
}

impl RefreshOutcome {
    #[must_use]
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published { .. })
    }
}

/// Owns the refresh cycle and the single writer side of a [`DatabaseHandle`]
pub struct RefreshScheduler {
    synchronizer: Arc<dyn Synchronizer>,
    source: Arc<dyn AdvisorySource>,
    handle: DatabaseHandle,
    config: RefreshConfig,
    in_flight: Mutex<()>,
    event_sender: Option<EventSender>,
}

impl RefreshScheduler {
    pub fn new(
        synchronizer: Arc<dyn Synchronizer>,
        source: Arc<dyn AdvisorySource>,
        handle: DatabaseHandle,
        config: RefreshConfig,
    ) -> Self {
        Self {
            synchronizer,
            source,
            handle,
            config,
            in_flight: Mutex::new(()),
            event_sender: None,
        }
    }

    /// Report cycle progress on `sender`
    #[must_use]
    pub fn with_events(mut self, sender: EventSender) -> Self {
        self.event_sender = Some(sender);
        self
    }

    #[must_use]
    pub fn handle(&self) -> &DatabaseHandle {
        &self.handle
    }

    #[must_use]
    pub fn config(&self) -> &RefreshConfig {
        &self.config
    }

    /// Run one sync, build and publish cycle.
    ///
    /// Returns [`RefreshOutcome::Skipped`] without doing anything if another
    /// cycle holds the scheduler. Dropping the returned future abandons the
    /// cycle; the handle is then either already swapped or untouched.
    pub async fn refresh_once(&self) -> RefreshOutcome {
        let Ok(_guard) = self.in_flight.try_lock() else {
            tracing::debug!("refresh already in flight, skipping");
            self.emit_vulndb(VulnDbEvent::RefreshSkipped);
            return RefreshOutcome::Skipped;
        };

        let started = Instant::now();
        self.emit_vulndb(VulnDbEvent::RefreshStarted);

        let fingerprint = match self.synchronize().await {
            Ok(fingerprint) => fingerprint,
            Err(error) => return self.fail(RefreshStage::Sync, error, started),
        };
        self.emit_vulndb(VulnDbEvent::SyncCompleted {
            fingerprint: fingerprint.to_string(),
            duration_ms: elapsed_ms(started),
        });

        let build_started = Instant::now();
        let built = match self.rebuild().await {
            Ok(built) => built,
            Err((stage, error)) => return self.fail(stage, error, started),
        };
        self.emit_vulndb(VulnDbEvent::BuildCompleted {
            records: built.records,
            packages: built.database.package_count(),
            duration_ms: elapsed_ms(build_started),
        });

        let advisories = built.database.len();
        let previous = self.handle.publish(DatabaseSnapshot::new(
            built.database,
            fingerprint.clone(),
            built.records,
        ));
        let previous = previous.fingerprint().cloned();

        tracing::info!(
            revision = %fingerprint.short(),
            advisories,
            elapsed_ms = elapsed_ms(started),
            "published vulnerability database"
        );
        self.emit_vulndb(VulnDbEvent::Published {
            fingerprint: fingerprint.to_string(),
            previous: previous.as_ref().map(ToString::to_string),
            advisories,
        });

        RefreshOutcome::Published {
            fingerprint,
            previous,
            advisories,
        }
    }

    /// Refresh now, then after every interval until `shutdown` turns true or
    /// its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            jitter_secs = self.config.jitter.as_secs(),
            "starting refresh loop"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = self.refresh_once() => {}
                _ = shutdown.changed() => {
                    tracing::info!("shutdown requested, abandoning refresh in flight");
                    break;
                }
            }

            // The cycle above has finished, so a tick can never overlap one.
            let delay = self.next_delay();
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => break,
            }
        }

        tracing::info!("refresh loop stopped");
    }

    /// Interval plus a uniformly random share of the jitter
    #[must_use]
    pub fn next_delay(&self) -> Duration {
        let jitter_ms = u64::try_from(self.config.jitter.as_millis()).unwrap_or(u64::MAX);
        if jitter_ms == 0 {
            return self.config.interval;
        }
        self.config
            .interval
            .saturating_add(Duration::from_millis(rand::random_range(0..=jitter_ms)))
    }

    async fn synchronize(&self) -> Result<Fingerprint, Error> {
        let timeout = self.config.sync_timeout;
        match tokio::time::timeout(timeout, self.synchronizer.sync()).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::Timeout {
                seconds: timeout.as_secs(),
            }
            .into()),
        }
    }

    async fn rebuild(&self) -> Result<BuiltDatabase, (RefreshStage, Error)> {
        let source = Arc::clone(&self.source);
        tokio::task::spawn_blocking(move || {
            let records = source
                .advisories()
                .map_err(|e| (RefreshStage::Read, e))?;
            build(records).map_err(|e| (RefreshStage::Build, e))
        })
        .await
        .map_err(|e| {
            (
                RefreshStage::Build,
                Error::internal(format!("build task failed: {e}")),
            )
        })?
    }

    fn fail(&self, stage: RefreshStage, error: Error, started: Instant) -> RefreshOutcome {
        tracing::warn!(
            %stage,
            error = %error,
            "refresh failed, keeping current database"
        );
        self.emit_vulndb(VulnDbEvent::RefreshFailed {
            stage,
            failure: FailureContext::from_error(&error),
            duration_ms: elapsed_ms(started),
        });
        RefreshOutcome::Failed { stage, error }
    }
}

impl EventEmitter for RefreshScheduler {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}
