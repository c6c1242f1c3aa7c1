//! Version and constraint parsing error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum VersionError {
    #[error("invalid version: {input}")]
    InvalidVersion { input: String },

    #[error("invalid version constraint: {input}")]
    InvalidConstraint { input: String },

    #[error("version parse error: {message}")]
    ParseError { message: String },
}

impl UserFacingError for VersionError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidVersion { .. } | Self::ParseError { .. } => {
                Some("Use dotted numeric versions like 1.2.3, optionally with a pre-release tag such as 1.2.3-rc1.")
            }
            Self::InvalidConstraint { .. } => {
                Some("Use a comparator (>=, >, <=, <, =, !=) immediately followed by a version.")
            }
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::InvalidVersion { .. } => "version.invalid_version",
            Self::InvalidConstraint { .. } => "version.invalid_constraint",
            Self::ParseError { .. } => "version.parse_error",
        };
        Some(code)
    }
}
