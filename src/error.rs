//! Error types for poco-schedule

use thiserror::Error;

/// Errors that can occur outside the total translator functions
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Cron expression could not be parsed
    #[error("Invalid cron expression: {0}")]
    InvalidExpression(String),

    /// Timezone name is not a known IANA zone
    #[error("Unknown timezone: {0}")]
    InvalidTimezone(String),

    /// Task input failed validation
    #[error("Invalid {field}: {reason}")]
    Validation {
        field: &'static str,
        reason: String,
    },

    /// Scheduled task not found
    #[error("Scheduled task not found: {0}")]
    TaskNotFound(String),

    /// Storage backend failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ScheduleError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }
}

/// Result type alias for schedule operations
pub type Result<T> = std::result::Result<T, ScheduleError>;
