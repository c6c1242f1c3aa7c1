//! Service metrics
//!
//! Counters, gauges and timings are derived from the event stream and
//! recorded through the `metrics` facade. Without an installed recorder every
//! call is a no-op; `serve --statsd` installs a statsd exporter so delivery
//! stays best effort and never affects checks or refreshes.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_statsd::{StatsdBuilder, StatsdError, StatsdRecorder};
use secscan_events::{AppEvent, CheckEvent, VulnDbEvent};
use thiserror::Error;

/// Datagrams are buffered up to this size before the exporter sends them
const STATSD_BUFFER_SIZE: usize = 512;

/// Reasons the statsd exporter could not be installed
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("expected host:port, got {0:?}")]
    Address(String),
    #[error(transparent)]
    Exporter(#[from] StatsdError),
    #[error("a metrics recorder is already installed")]
    Recorder,
}

/// Split `host:port`; an IPv6 host may be bracketed
fn split_remote(remote: &str) -> Result<(&str, u16), InstallError> {
    let (host, port) = remote
        .rsplit_once(':')
        .ok_or_else(|| InstallError::Address(remote.to_string()))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    let port = port
        .parse()
        .map_err(|_| InstallError::Address(remote.to_string()))?;
    if host.is_empty() {
        return Err(InstallError::Address(remote.to_string()));
    }
    Ok((host, port))
}

/// Build a statsd recorder sending to `remote`
///
/// `prefix` is joined to every metric name with a dot; a trailing dot in the
/// configured value is accepted.
///
/// # Errors
///
/// Returns an error if `remote` is malformed or no UDP socket can be set up.
pub fn statsd_recorder(
    remote: &str,
    prefix: &str,
) -> Result<StatsdRecorder, InstallError> {
    let (host, port) = split_remote(remote)?;
    let prefix = prefix.trim_end_matches('.');
    StatsdBuilder::from(host, port)
        .with_buffer_size(STATSD_BUFFER_SIZE)
        .histogram_is_timer()
        .build((!prefix.is_empty()).then_some(prefix))
        .map_err(InstallError::from)
}

/// Install the statsd exporter as the global recorder
///
/// # Errors
///
/// Returns an error if the recorder cannot be built or one is already set.
pub fn install_statsd(remote: &str, prefix: &str) -> Result<(), InstallError> {
    let recorder = statsd_recorder(remote, prefix)?;
    metrics::set_global_recorder(recorder).map_err(|_| InstallError::Recorder)?;
    register_metrics();
    Ok(())
}

/// Describe every metric the service reports
pub fn register_metrics() {
    describe_histogram!("fetch.timetaken", "Advisory corpus synchronization time in milliseconds");
    describe_gauge!("database.vulnerabilities", "Advisories in the live database");
    describe_counter!("refresh.failed", "Refresh cycles that kept the previous database");
    describe_counter!("checks.total", "Check requests, including malformed ones");
    describe_histogram!("checks.timetaken", "Check time in milliseconds");
    describe_counter!("checks.success.vulnerable", "Checks that found a vulnerable package");
    describe_counter!("checks.success.notvulnerable", "Checks that found nothing");
    describe_counter!("checks.failed.decode", "Check requests whose body did not decode");
}

#[allow(clippy::cast_precision_loss)]
fn millis(ms: u64) -> f64 {
    ms as f64
}

/// Record the metrics derived from `event`; most events report nothing
pub fn record(event: &AppEvent) {
    match event {
        AppEvent::VulnDb(VulnDbEvent::SyncCompleted { duration_ms, .. }) => {
            histogram!("fetch.timetaken").record(millis(*duration_ms));
        }
        AppEvent::VulnDb(VulnDbEvent::Published { advisories, .. }) => {
            gauge!("database.vulnerabilities").set(u32::try_from(*advisories).unwrap_or(u32::MAX));
        }
        AppEvent::VulnDb(VulnDbEvent::RefreshFailed { .. }) => {
            counter!("refresh.failed").increment(1);
        }
        AppEvent::Check(CheckEvent::Completed {
            vulnerable,
            duration_ms,
            ..
        }) => {
            counter!("checks.total").increment(1);
            histogram!("checks.timetaken").record(millis(*duration_ms));
            if *vulnerable {
                counter!("checks.success.vulnerable").increment(1);
            } else {
                counter!("checks.success.notvulnerable").increment(1);
            }
        }
        AppEvent::Check(CheckEvent::DecodeFailed { .. }) => {
            counter!("checks.total").increment(1);
            counter!("checks.failed.decode").increment(1);
        }
        _ => {}
    }
}
