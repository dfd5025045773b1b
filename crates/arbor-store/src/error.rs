//! Error types for the node store.

use thiserror::Error;

/// Errors that can occur in store operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Validation failed: {}", .errors.join("; "))]
    Validation { errors: Vec<String> },

    #[error("Node not found: {0}")]
    NotFound(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

impl StoreError {
    pub(crate) fn not_found(id: impl std::fmt::Display) -> Self {
        StoreError::NotFound(id.to_string())
    }

    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        StoreError::InvariantViolation(message.into())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<regex::Error> for StoreError {
    fn from(err: regex::Error) -> Self {
        StoreError::InvalidPattern(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
