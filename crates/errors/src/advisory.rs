//! Advisory corpus and database build error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum AdvisoryError {
    #[error("failed to decode advisory {path}: {message}")]
    Decode { path: String, message: String },

    #[error("failed to read advisory corpus at {path}: {message}")]
    CorpusUnreadable { path: String, message: String },

    #[error("advisory {path} has no package reference")]
    MissingReference { path: String },

    #[error("database build failed: {message}")]
    BuildFailed { message: String },
}

impl UserFacingError for AdvisoryError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Decode { .. } | Self::MissingReference { .. } => Some(
                "The advisory corpus contains a malformed record; the previous database stays in service until it is fixed upstream.",
            ),
            Self::CorpusUnreadable { .. } => {
                Some("Check that the checkout directory exists and is readable.")
            }
            Self::BuildFailed { .. } => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::CorpusUnreadable { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::Decode { .. } => "advisory.decode",
            Self::CorpusUnreadable { .. } => "advisory.corpus_unreadable",
            Self::MissingReference { .. } => "advisory.missing_reference",
            Self::BuildFailed { .. } => "advisory.build_failed",
        };
        Some(code)
    }
}
