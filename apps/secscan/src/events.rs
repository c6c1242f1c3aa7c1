//! Event handling for the CLI and the service
//!
//! A single task drains the event channel, writes every event to the log and
//! records its metrics. Metrics only leave the process once a recorder such
//! as the statsd exporter has been installed.

use crate::logging::log_event_with_tracing;
use crate::metrics::record;
use secscan_events::{AppEvent, EventReceiver};
use tokio::task::JoinHandle;

/// Consumer side of the event channel
#[derive(Debug, Default)]
pub struct EventHandler;

impl EventHandler {
    /// Create new event handler
    pub fn new() -> Self {
        Self
    }

    /// Handle incoming event
    pub fn handle_event(&self, event: &AppEvent) {
        log_event_with_tracing(event);
        record(event);
    }

    /// Drain `receiver` until every sender has been dropped
    pub async fn run(self, mut receiver: EventReceiver) {
        while let Some(event) = receiver.recv().await {
            self.handle_event(&event);
        }
    }

    /// Run the handler on its own task
    pub fn spawn(self, receiver: EventReceiver) -> JoinHandle<()> {
        tokio::spawn(self.run(receiver))
    }
}
