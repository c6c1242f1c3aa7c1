use serde::{Deserialize, Serialize};

/// Query engine events, one batch per check
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckEvent {
    /// An item could not be checked and was left out of the verdict
    ItemSkipped {
        package: String,
        version: String,
        reason: String,
    },

    /// A batch finished
    Completed {
        items: usize,
        vulnerable_items: usize,
        skipped: usize,
        vulnerable: bool,
        duration_ms: u64,
    },

    /// A request body could not be decoded into check items
    DecodeFailed { reason: String },
}
