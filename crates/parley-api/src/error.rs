//! Error types for parley-api

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Result type alias using parley-api Error
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification used by callers to decide how to surface a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Request or channel connectivity failure
    Transport,
    /// Referenced conversation or message no longer exists
    NotFound,
    /// Input rejected before any I/O
    Validation,
}

/// Errors that can occur when talking to the chat backend
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket transport failed
    #[error("WebSocket error: {0}")]
    WebSocket(Box<tungstenite::Error>),

    /// API returned a non-success status
    #[error("API error: {message} (status: {status})")]
    Api { status: u16, message: String },

    /// Conversation or message not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Input rejected before any request was made
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Push channel is not connected
    #[error("Channel not connected")]
    NotConnected,

    /// Push channel is connected but has not joined a conversation
    #[error("Channel has not joined a conversation")]
    NotJoined,

    /// Invalid configuration (bad URL etc.)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<tungstenite::Error> for Error {
    fn from(e: tungstenite::Error) -> Self {
        Error::WebSocket(Box::new(e))
    }
}

impl Error {
    /// Create an API error from a status code and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Validation(_) | Error::InvalidConfig(_) => ErrorKind::Validation,
            Error::Api { status: 404, .. } => ErrorKind::NotFound,
            Error::Http(_)
            | Error::Json(_)
            | Error::WebSocket(_)
            | Error::Api { .. }
            | Error::NotConnected
            | Error::NotJoined => ErrorKind::Transport,
        }
    }

    /// Check if this error means the referenced resource is gone
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Check if retrying the same request could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => e.is_timeout() || e.is_connect(),
            Error::WebSocket(e) => matches!(
                e.as_ref(),
                tungstenite::Error::Io(_)
                    | tungstenite::Error::ConnectionClosed
                    | tungstenite::Error::AlreadyClosed
            ),
            Error::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
