//! Error types for the chat client.

use thiserror::Error;

/// Failure of a single stream session.
///
/// The controller treats every variant except [`ChatError::Cancelled`] the
/// same way: the failure is logged and the bot message is replaced by the
/// error notice.
#[derive(Error, Debug)]
pub enum ChatError {
    /// The endpoint answered with a non-success HTTP status.
    #[error("server responded with status {0}")]
    Status(u16),

    /// Connecting, sending, or reading the response body failed.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The configured endpoint is not a valid URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    /// No data arrived within the read timeout.
    #[error("no response within {0:?}")]
    TimedOut(std::time::Duration),

    /// The session was aborted through its [`AbortHandle`](crate::controller::AbortHandle).
    #[error("stream cancelled")]
    Cancelled,
}

/// Result alias for chat client operations.
pub type Result<T> = std::result::Result<T, ChatError>;
