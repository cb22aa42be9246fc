//! Error types for remote fetches.

use thiserror::Error;

/// Result type for remote fetches.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Errors a [`crate::RemoteSource`] can report.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The server could not be reached.
    #[error("server unreachable: {0}")]
    Unreachable(String),

    /// The server answered with an error status.
    #[error("server returned {status}: {message}")]
    Status {
        /// HTTP-like status code.
        status: u16,
        /// Error message.
        message: String,
    },

    /// The response could not be decoded.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The request timed out.
    #[error("request timed out")]
    Timeout,
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        RemoteError::Malformed(err.to_string())
    }
}
