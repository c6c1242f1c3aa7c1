//! Structured logging integration for events
//!
//! Converts domain events into tracing records with structured fields so the
//! same stream can be read by humans on a terminal or shipped as JSON.

use secscan_events::{AppEvent, CheckEvent, GeneralEvent, VulnDbEvent};
use tracing::{debug, info, warn};

/// Log an `AppEvent` using the tracing infrastructure with structured fields
pub fn log_event_with_tracing(event: &AppEvent) {
    match event {
        AppEvent::General(general) => match general {
            GeneralEvent::Warning { message, context } => {
                warn!(target: "secscan::events::general", context = ?context, "{message}");
            }
            GeneralEvent::ConfigurationLoaded { sources, warnings } => {
                info!(target: "secscan::events::general", sources = ?sources, warnings = ?warnings, "Configuration loaded");
            }
        },

        AppEvent::VulnDb(vulndb) => match vulndb {
            VulnDbEvent::RefreshStarted => {
                debug!(target: "secscan::events::vulndb", "Refresh started");
            }
            VulnDbEvent::RefreshSkipped => {
                debug!(target: "secscan::events::vulndb", "Refresh skipped, previous cycle still running");
            }
            VulnDbEvent::SyncCompleted {
                fingerprint,
                duration_ms,
            } => {
                debug!(
                    target: "secscan::events::vulndb",
                    fingerprint = %fingerprint,
                    duration_ms,
                    "Advisory corpus synchronized"
                );
            }
            VulnDbEvent::BuildCompleted {
                records,
                packages,
                duration_ms,
            } => {
                debug!(
                    target: "secscan::events::vulndb",
                    records,
                    packages,
                    duration_ms,
                    "Vulnerability database built"
                );
            }
            VulnDbEvent::Published {
                fingerprint,
                previous,
                advisories,
            } => {
                info!(
                    target: "secscan::events::vulndb",
                    fingerprint = %fingerprint,
                    previous = ?previous,
                    advisories,
                    "Database contains {advisories} vulnerabilities"
                );
            }
            VulnDbEvent::RefreshFailed {
                stage,
                failure,
                duration_ms,
            } => {
                warn!(
                    target: "secscan::events::vulndb",
                    stage = %stage,
                    retryable = failure.retryable,
                    code = ?failure.code,
                    message = %failure.message,
                    hint = ?failure.hint,
                    duration_ms,
                    "Refresh failed, serving previous database"
                );
            }
        },

        AppEvent::Check(check) => match check {
            CheckEvent::ItemSkipped {
                package,
                version,
                reason,
            } => {
                warn!(
                    target: "secscan::events::check",
                    package = %package,
                    version = %version,
                    reason = %reason,
                    "Package skipped"
                );
            }
            CheckEvent::Completed {
                items,
                vulnerable_items,
                skipped,
                vulnerable,
                duration_ms,
            } => {
                info!(
                    target: "secscan::events::check",
                    items,
                    vulnerable_items,
                    skipped,
                    vulnerable,
                    duration_ms,
                    "Lock file is {}",
                    if *vulnerable { "vulnerable" } else { "not vulnerable" }
                );
            }
            CheckEvent::DecodeFailed { reason } => {
                warn!(target: "secscan::events::check", reason = %reason, "Malformed check request");
            }
        },
    }
}
