//! # Directory Error Types Module
//!
//! Errors raised while talking to the remote user/conversation directory.

use thiserror::Error;

/// Custom error types for directory operations
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The request never produced a response (connect, timeout, TLS...)
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The service answered with a non-success status
    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    /// A conversation was created but the response carried no `_id`
    #[error("Response did not contain an _id field")]
    MissingId,
}

impl DirectoryError {
    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            DirectoryError::Transport(_) => true,
            DirectoryError::Status { status, .. } => *status >= 500,
            DirectoryError::MissingId => false,
        }
    }
}
