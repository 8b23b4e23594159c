//! Error types for the meal-plan intake.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Submission error: {0}")]
    Submit(#[from] SubmitError),

    #[error("Step error: {0}")]
    Step(#[from] StepError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("HTTP client could not be built: {0}")]
    Client(String),
}

/// Failure cause of a single `submit()` attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitFailureKind {
    /// The request never reached the server or no response arrived.
    Transport,
    /// A response arrived with a non-success status.
    Status,
    /// The response body was not valid JSON.
    Decode,
    /// The payload itself could not be encoded.
    Serialize,
}

impl std::fmt::Display for SubmitFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Transport => "transport",
            Self::Status => "status",
            Self::Decode => "decode",
            Self::Serialize => "serialize",
        };
        write!(f, "{s}")
    }
}

/// Errors surfaced by `IntakeAggregator::submit`.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("Request to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("Request to {endpoint} timed out after {timeout:?}")]
    Timeout { endpoint: String, timeout: Duration },

    #[error("Server responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Response body is not valid JSON: {reason}")]
    Decode { reason: String },

    #[error("Failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl SubmitError {
    /// Classify the failure. Timeouts count as transport failures.
    pub fn kind(&self) -> SubmitFailureKind {
        match self {
            Self::Transport { .. } | Self::Timeout { .. } => SubmitFailureKind::Transport,
            Self::Status { .. } => SubmitFailureKind::Status,
            Self::Decode { .. } => SubmitFailureKind::Decode,
            Self::Serialize(_) => SubmitFailureKind::Serialize,
        }
    }
}

/// Errors raised by the step layer before it touches the aggregator.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("Field {field} must not be empty")]
    Incomplete { field: &'static str },

    #[error("Field {field} is not a valid number: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("User identity token has not arrived yet")]
    Unauthenticated,

    #[error("Operation {operation} is not available on step {step}")]
    WrongStep {
        operation: &'static str,
        step: String,
    },

    #[error("Submission failed: {0}")]
    Submit(#[from] SubmitError),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
