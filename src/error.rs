//! Error types for Chathist
//!
//! This module defines all error types used throughout the crate,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Chathist operations
///
/// Covers the history store taxonomy (unavailable store, missing records,
/// snapshot cleanup failures, rejected user requests) as well as the
/// configuration and serialization errors of the surrounding application.
#[derive(Error, Debug)]
pub enum ChathistError {
    /// The underlying persistent store could not be opened or is not initialized
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A delete, duplicate, export, or rename referenced a missing record
    #[error("Conversation not found: {0}")]
    NotFound(String),

    /// Snapshot cleanup failed; never fatal to the owning record deletion
    #[error("Snapshot deletion failed for {record_id}: {message}")]
    SnapshotDeletionFailed {
        /// Record whose snapshot could not be removed
        record_id: String,
        /// Underlying failure description
        message: String,
    },

    /// A user request was rejected before touching the store
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Conversation storage errors (database operations)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ChathistError {
    /// Recover the typed error carried by an `anyhow::Error`
    ///
    /// Errors that did not originate as a `ChathistError` are folded into
    /// [`ChathistError::Storage`] with their display text.
    pub fn classify(err: anyhow::Error) -> Self {
        match err.downcast::<ChathistError>() {
            Ok(typed) => typed,
            Err(other) => ChathistError::Storage(format!("{:#}", other)),
        }
    }
}

/// Result type alias for Chathist operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
