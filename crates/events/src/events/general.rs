use serde::{Deserialize, Serialize};

/// General utility events for warnings and configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeneralEvent {
    /// Generic warning message with optional context
    Warning {
        message: String,
        context: Option<String>,
    },

    /// Configuration loaded, with the sources that contributed to it
    ConfigurationLoaded {
        sources: Vec<String>,
        warnings: Vec<String>,
    },
}

impl GeneralEvent {
    /// Create a warning event with context
    pub fn warning_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Warning {
            message: message.into(),
            context: Some(context.into()),
        }
    }
}
