//! Error types for parley-sync

use parley_api::ErrorKind;
use thiserror::Error;

/// Result type alias using parley-sync Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the sync controller and session bootstrap
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the API / channel layer
    #[error(transparent)]
    Api(#[from] parley_api::Error),

    /// Operation needs an active conversation
    #[error("No active conversation")]
    NoConversation,

    /// Input rejected before any I/O
    #[error("Invalid input: {0}")]
    Validation(String),
}

impl Error {
    /// Classify this error into the transport / not-found / validation taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Api(e) => e.kind(),
            Error::NoConversation | Error::Validation(_) => ErrorKind::Validation,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}
