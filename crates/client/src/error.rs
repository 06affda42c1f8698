//! Error types for the list client.

use thiserror::Error;

use daftar_core::error::DomainError;

/// Errors raised while fetching or assembling pages.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The catalog rejected the request or its store failed.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The request never produced a response (connection, HTTP status).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server answered with an error code this client has no mapping for.
    #[error("Remote error {code}: {message}")]
    Remote { code: String, message: String },

    /// The response body could not be read as a page.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Page size cannot change once pages are loaded.
    #[error("page size is fixed once pages are loaded")]
    PageSizeLocked,

    /// A page that is not the last one must be exactly one page size long.
    #[error("irregular page: expected {expected} items, got {got}")]
    IrregularPage { expected: usize, got: usize },
}

impl ClientError {
    /// Whether the failure is the catalog store being unreachable.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ClientError::Domain(e) if e.is_unavailable())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
