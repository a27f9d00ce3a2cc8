//! Error types for the console

use thiserror::Error;

/// Remote document store error
#[derive(Debug, Error)]
pub enum StoreError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Base64 decode error
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Document does not exist at the configured path
    #[error("Document not found: {0}")]
    NotFound(String),

    /// The supplied version no longer matches the stored one
    #[error("Version conflict: {0}")]
    Conflict(String),

    /// Server returned an error
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Invalid response from server
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Client could not be built from its configuration
    #[error("Invalid store configuration: {0}")]
    Config(String),

    /// Store could not be reached at all
    #[error("Store unreachable: {0}")]
    Unreachable(String),
}

impl StoreError {
    /// True when the write was rejected because the version moved on
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

/// Domain error raised by the mutation engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    #[error("User already exists")]
    DuplicateUser(String),
}

/// Error surfaced to the admin for a failed operation
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// Mutation rejected before any write
    #[error(transparent)]
    Mutation(#[from] MutationError),

    /// Document could not be read and the read policy forbids continuing
    #[error("store read failed: {0}")]
    Read(StoreError),

    /// Commit failed, including version conflicts
    #[error(transparent)]
    Write(StoreError),
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
