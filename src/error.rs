//! Error types for Goalpost.

use thiserror::Error;

/// Goalpost error type.
#[derive(Error, Debug)]
pub enum GoalpostError {
    /// Store unreachable or a statement failed
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Goals table is missing columns that could not be added
    #[error("schema mismatch: goals table is missing column '{column}'")]
    SchemaMismatch { column: String },

    /// A stored goal row could not be turned back into a Goal
    #[error("could not decode goal record {id}: {reason}")]
    RecordDecode { id: String, reason: String },

    /// Unknown goal, milestone or routine id
    #[error("not found: {0}")]
    NotFound(String),

    /// Generation or vision runtime failure
    #[error("collaborator error: {0}")]
    Collaborator(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for Goalpost.
pub type Result<T> = std::result::Result<T, GoalpostError>;
