use serde::{Deserialize, Serialize};
use std::fmt;

use super::FailureContext;

/// Step of a refresh cycle at which a failure occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshStage {
    Sync,
    Read,
    Build,
    Publish,
}

impl fmt::Display for RefreshStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sync => "sync",
            Self::Read => "read",
            Self::Build => "build",
            Self::Publish => "publish",
        })
    }
}

/// Vulnerability database lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VulnDbEvent {
    /// A refresh cycle began
    RefreshStarted,

    /// A trigger arrived while a cycle was already in flight
    RefreshSkipped,

    /// The advisory corpus was brought up to date
    SyncCompleted {
        fingerprint: String,
        duration_ms: u64,
    },

    /// A fresh database was built from the corpus
    BuildCompleted {
        records: usize,
        packages: usize,
        duration_ms: u64,
    },

    /// The new database replaced the current one
    Published {
        fingerprint: String,
        previous: Option<String>,
        advisories: usize,
    },

    /// The cycle was abandoned; the current database is unchanged
    RefreshFailed {
        stage: RefreshStage,
        failure: FailureContext,
        duration_ms: u64,
    },
}
