#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for async communication in secscan
//!
//! Library crates report what they do by sending [`AppEvent`]s on an
//! unbounded channel. The binary decides what to do with them: render them
//! as `tracing` records, record them as metrics, or drop them. Events are
//! never fed back into core logic.
//!
//! ## Architecture
//!
//! - **Domain-driven events**: grouped by functional domain (`VulnDb`, `Check`)
//! - **Unified `EventEmitter` trait**: one API whether you hold a raw
//!   `EventSender` or a struct that may carry one
//! - **Serializable**: events are tagged by domain so they can be shipped as
//!   structured log fields

pub mod events;
pub use events::{
    AppEvent, CheckEvent, FailureContext, GeneralEvent, RefreshStage, VulnDbEvent,
};

use tokio::sync::mpsc::UnboundedSender;

/// Type alias for event sender
pub type EventSender = UnboundedSender<AppEvent>;

/// Type alias for event receiver
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<AppEvent>;

/// Create a new event channel
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting events throughout secscan
///
/// This trait provides a single, consistent API for emitting events regardless of
/// whether you have a raw `EventSender` or a struct that contains one.
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Emit an event through this emitter
    fn emit(&self, event: AppEvent) {
        if let Some(sender) = self.event_sender() {
            // Ignore send errors - if receiver is dropped, we just continue
            let _ = sender.send(event);
        }
    }

    /// Emit a warning event with context
    fn emit_warning_with_context(&self, message: impl Into<String>, context: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning_with_context(
            message, context,
        )));
    }

    /// Emit a refresh lifecycle event
    fn emit_vulndb(&self, event: VulnDbEvent) {
        self.emit(AppEvent::VulnDb(event));
    }

    /// Emit a query engine event
    fn emit_check(&self, event: CheckEvent) {
        self.emit(AppEvent::Check(event));
    }
}

/// Implementation of `EventEmitter` for the raw `EventSender`
/// This allows `EventSender` to be used directly where `EventEmitter` is expected
impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}

/// Components built without a channel carry `None` and emit nothing
impl EventEmitter for Option<EventSender> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_through_sender() {
        let (tx, mut rx) = channel();
        tx.emit_warning_with_context("advisory corpus is stale", "last sync 3 days ago");
        tx.emit_vulndb(VulnDbEvent::RefreshStarted);

        match rx.recv().await {
            Some(AppEvent::General(GeneralEvent::Warning { message, context })) => {
                assert_eq!(message, "advisory corpus is stale");
                assert_eq!(context.as_deref(), Some("last sync 3 days ago"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(matches!(
            rx.recv().await,
            Some(AppEvent::VulnDb(VulnDbEvent::RefreshStarted))
        ));
    }

    #[test]
    fn test_emit_without_receiver_is_silent() {
        let (tx, rx) = channel();
        drop(rx);
        tx.emit_warning_with_context("nobody listening", "receiver dropped");

        let none: Option<EventSender> = None;
        none.emit_warning_with_context("dropped", "no channel");
    }
}
