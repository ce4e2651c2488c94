//! Client error types.

use thiserror::Error;

/// Result type for backend calls.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure (connect, timeout, body decode).
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend has no such document or conversation.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend answered with a non-success status.
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The byte transfer to a presigned URL failed.
    #[error("upload transfer failed: {0}")]
    Transfer(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }

    pub fn is_transfer(&self) -> bool {
        matches!(self, ClientError::Transfer(_))
    }
}
