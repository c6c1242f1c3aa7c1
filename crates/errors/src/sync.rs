//! Advisory source synchronization error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum SyncError {
    #[error("failed to clone {url}: {message}")]
    CloneFailed { url: String, message: String },

    #[error("failed to fetch {remote}: {message}")]
    FetchFailed { remote: String, message: String },

    #[error("branch {branch} not found on remote")]
    BranchNotFound { branch: String },

    #[error("failed to check out {revision}: {message}")]
    CheckoutFailed { revision: String, message: String },

    #[error("repository error: {message}")]
    Repository { message: String },

    #[error("sync timed out after {seconds} seconds")]
    Timeout { seconds: u64 },
}

impl UserFacingError for SyncError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::CloneFailed { .. } | Self::FetchFailed { .. } | Self::Timeout { .. } => {
                Some("Check network connectivity to the advisory repository and retry.")
            }
            Self::BranchNotFound { .. } => Some("Set the advisory branch with --branch or SECSCAN_BRANCH."),
            Self::CheckoutFailed { .. } | Self::Repository { .. } => {
                Some("Remove the checkout directory to force a fresh clone.")
            }
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::CloneFailed { .. } | Self::FetchFailed { .. } | Self::Timeout { .. }
        )
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::CloneFailed { .. } => "sync.clone_failed",
            Self::FetchFailed { .. } => "sync.fetch_failed",
            Self::BranchNotFound { .. } => "sync.branch_not_found",
            Self::CheckoutFailed { .. } => "sync.checkout_failed",
            Self::Repository { .. } => "sync.repository",
            Self::Timeout { .. } => "sync.timeout",
        };
        Some(code)
    }
}
