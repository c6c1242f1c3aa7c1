use serde::{Deserialize, Serialize};

use secscan_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureContext {
    /// Stable error code, e.g. `sync.fetch_failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    /// Construct a new failure context.
    #[must_use]
    pub fn new(
        code: Option<impl Into<String>>,
        message: impl Into<String>,
        hint: Option<impl Into<String>>,
        retryable: bool,
    ) -> Self {
        Self {
            code: code.map(Into::into),
            message: message.into(),
            hint: hint.map(Into::into),
            retryable,
        }
    }

    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self::new(
            error.user_code(),
            error.user_message().into_owned(),
            error.user_hint(),
            error.is_retryable(),
        )
    }
}

pub mod check;
pub mod general;
pub mod vulndb;

pub use check::*;
pub use general::*;
pub use vulndb::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// General utility events (warnings, configuration)
    General(GeneralEvent),

    /// Database refresh lifecycle (sync, build, publish)
    VulnDb(VulnDbEvent),

    /// Query engine batches
    Check(CheckEvent),
}

#[cfg(test)]
mod tests {
    use super::*;
    use secscan_errors::SyncError;

    #[test]
    fn test_failure_context_from_error() {
        let err = SyncError::FetchFailed {
            remote: "origin".into(),
            message: "connection reset".into(),
        };
        let ctx = FailureContext::from_error(&err);
        assert_eq!(ctx.code.as_deref(), Some("sync.fetch_failed"));
        assert!(ctx.retryable);
        assert!(ctx.hint.is_some());
        assert!(ctx.message.contains("connection reset"));
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = AppEvent::Check(CheckEvent::ItemSkipped {
            package: "vendor/pkg".into(),
            version: "dev-master".into(),
            reason: "invalid version".into(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["domain"], "check");
        assert_eq!(json["event"]["type"], "item_skipped");
        assert_eq!(json["event"]["package"], "vendor/pkg");
    }
}
