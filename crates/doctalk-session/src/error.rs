use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use doctalk_client::ClientError;

/// The closed set of failure categories the presenter distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ErrorKind {
    UnsupportedType,
    TransferFailed,
    AlreadyInProgress,
    EmptyPrompt,
    InvalidState,
    NotFound,
    NetworkFailure,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("unsupported content type: {0}")]
    UnsupportedType(String),

    #[error("upload transfer failed: {0}")]
    TransferFailed(String),

    #[error("{0} already in progress")]
    AlreadyInProgress(&'static str),

    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("network failure: {0}")]
    NetworkFailure(String),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::UnsupportedType(_) => ErrorKind::UnsupportedType,
            SessionError::TransferFailed(_) => ErrorKind::TransferFailed,
            SessionError::AlreadyInProgress(_) => ErrorKind::AlreadyInProgress,
            SessionError::EmptyPrompt => ErrorKind::EmptyPrompt,
            SessionError::InvalidState(_) => ErrorKind::InvalidState,
            SessionError::NotFound(_) => ErrorKind::NotFound,
            SessionError::NetworkFailure(_) => ErrorKind::NetworkFailure,
        }
    }
}

impl From<ClientError> for SessionError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::NotFound(what) => SessionError::NotFound(what),
            ClientError::Transfer(msg) => SessionError::TransferFailed(msg),
            ClientError::Api { status, message } => {
                SessionError::NetworkFailure(format!("backend returned {status}: {message}"))
            }
            other => SessionError::NetworkFailure(other.to_string()),
        }
    }
}

/// A failure as recorded in a snapshot for the presenter to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&SessionError> for Failure {
    fn from(e: &SessionError) -> Self {
        Failure {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}
