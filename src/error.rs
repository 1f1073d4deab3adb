//! Error handling module for the stepper
//!
//! Provides centralized error types using thiserror. Navigation itself never
//! fails with an error (it reports `false`); the only engine-level failure is
//! a duplicate alias at registration time.

use thiserror::Error;

/// Main error type for stepflow
#[derive(Error, Debug)]
pub enum StepperError {
    /// Two steps asked for the same alias
    #[error("Duplicate alias '{alias}': already owned by step {existing}, requested by step {requested}. Each step must have a unique alias.")]
    DuplicateAlias {
        alias: String,
        existing: usize,
        requested: usize,
    },

    /// Wizard definition errors (loading, parsing, validation)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed navigation script command
    #[error("Command error: {0}")]
    Command(String),

    /// IO errors (reading or writing wizard definitions)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors (payloads, definitions)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for stepper operations
pub type Result<T> = std::result::Result<T, StepperError>;

impl StepperError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a command error
    pub fn command(msg: impl Into<String>) -> Self {
        Self::Command(msg.into())
    }

    /// Returns true if this is a duplicate alias error
    pub fn is_duplicate_alias(&self) -> bool {
        matches!(self, Self::DuplicateAlias { .. })
    }
}
