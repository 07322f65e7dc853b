//! Claims domain errors

use thiserror::Error;

/// Errors raised while loading a claim
///
/// All of these are fatal for the claim: the pipeline halts before any
/// agent stage runs.
#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("Invalid claim field '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Claim file not found: {0}")]
    FileNotFound(String),

    #[error("Claim document is not valid JSON: {0}")]
    MalformedJson(String),

    #[error("Could not read claim file {path}: {message}")]
    Io { path: String, message: String },
}

impl ClaimError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ClaimError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn missing(field: impl Into<String>) -> Self {
        Self::validation(field, "required field is missing")
    }

    /// The offending field, for validation failures
    pub fn field(&self) -> Option<&str> {
        match self {
            ClaimError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}
