//! CLI error handling

use std::fmt;
use std::path::PathBuf;

use secscan_errors::UserFacingError;

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Configuration error
    Config(secscan_errors::ConfigError),
    /// Error from the library crates
    Ops(secscan_errors::Error),
    /// The lock file could not be read or decoded
    Lockfile { path: PathBuf, message: String },
    /// The HTTP server failed
    Server(String),
    /// I/O error
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => write!(f, "Configuration error: {e}"),
            CliError::Ops(e) => {
                let message = e.user_message();
                write!(f, "{message}")?;
                if let Some(code) = e.user_code() {
                    write!(f, "\n  Code: {code}")?;
                }
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                if e.is_retryable() {
                    write!(f, "\n  Retry: safe to retry this operation.")?;
                }
                Ok(())
            }
            CliError::Lockfile { path, message } => {
                write!(f, "Unable to read lock file {}: {message}", path.display())
            }
            CliError::Server(msg) => write!(f, "Server error: {msg}"),
            CliError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Ops(e) => Some(e),
            CliError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<secscan_errors::ConfigError> for CliError {
    fn from(e: secscan_errors::ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<secscan_errors::Error> for CliError {
    fn from(e: secscan_errors::Error) -> Self {
        match e {
            secscan_errors::Error::Config(e) => CliError::Config(e),
            other => CliError::Ops(other),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secscan_errors::{ConfigError, SyncError};

    #[test]
    fn test_ops_error_rendering() {
        let err: CliError = secscan_errors::Error::from(SyncError::Timeout { seconds: 120 }).into();
        let rendered = err.to_string();
        assert!(rendered.contains("120 seconds"));
        assert!(rendered.contains("Code: sync.timeout"));
        assert!(rendered.contains("Retry: safe to retry"));
    }

    #[test]
    fn test_config_errors_are_unwrapped() {
        let err: CliError = secscan_errors::Error::from(ConfigError::InvalidValue {
            field: "SECSCAN_PORT".into(),
            value: "x".into(),
        })
        .into();
        assert!(matches!(err, CliError::Config(_)));
    }
}
