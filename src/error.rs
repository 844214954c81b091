//! Error types for the session controller and its collaborators

use crate::services::TabId;

/// All errors that can occur while driving the timer state machine.
///
/// Most of these never reach the user: storage, tab and messaging failures
/// are logged and the state machine degrades. Only `InvalidSettings` is
/// meant to be shown.
#[derive(Debug, thiserror::Error)]
pub enum FocusError {
    #[error("Storage operation failed for {key}: {details}")]
    Storage { key: String, details: String },

    #[error("Stored value for {key} is malformed: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Tab {tab_id} operation failed: {details}")]
    Tab { tab_id: TabId, details: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FocusError {
    pub fn storage(key: impl Into<String>, details: impl ToString) -> Self {
        FocusError::Storage {
            key: key.into(),
            details: details.to_string(),
        }
    }

    pub fn tab(tab_id: TabId, details: impl ToString) -> Self {
        FocusError::Tab {
            tab_id,
            details: details.to_string(),
        }
    }

    /// Whether this error should be shown to the user rather than just logged.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, FocusError::InvalidSettings(_))
    }
}

pub type Result<T> = std::result::Result<T, FocusError>;
