//! Error types for the Voltio core library.
//!
//! One taxonomy covers every operation the core performs: input validation,
//! authorization preconditions, missing document references, and transport
//! failures at the store or network layer. Validation and authorization
//! errors are always raised before any write; transport errors are surfaced
//! to the caller, which owns rolling back optimistic local state.

use thiserror::Error;

/// The main error type for Voltio core operations.
#[derive(Debug, Error)]
pub enum VoltioError {
    /// Malformed input: an out-of-range rating, an empty message, an
    /// invalid workflow step.
    #[error("validation error: {0}")]
    Validation(String),

    /// The caller is not allowed to perform the operation: a non-seller
    /// completing a sale, a non-buyer rating the seller, a non-admin
    /// deleting, a seller opening a chat on their own listing.
    #[error("authorization error: {0}")]
    Authorization(String),

    /// A stale or missing listing, chat, or user reference.
    #[error("not found: {0}")]
    NotFound(String),

    /// A subscription or write failed at the store/network layer. All
    /// transport-level failures collapse into this variant; timeouts and
    /// retries belong to the transport itself.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Result type alias for Voltio core operations.
pub type VoltioResult<T> = Result<T, VoltioError>;

impl VoltioError {
    pub fn validation(message: impl Into<String>) -> Self {
        VoltioError::Validation(message.into())
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        VoltioError::Authorization(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        VoltioError::NotFound(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        VoltioError::Transport(message.into())
    }

    /// Translate a backend authority response into the taxonomy. The HTTP
    /// status is the sole success signal the workflow consumes; the `{error}`
    /// body message is carried through verbatim.
    pub fn from_backend_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            400 => VoltioError::Validation(message),
            401 | 403 => VoltioError::Authorization(message),
            404 => VoltioError::NotFound(message),
            _ => VoltioError::Transport(format!("backend returned {}: {}", status, message)),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, VoltioError::Validation(_))
    }

    pub fn is_authorization(&self) -> bool {
        matches!(self, VoltioError::Authorization(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, VoltioError::NotFound(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, VoltioError::Transport(_))
    }
}

impl From<reqwest::Error> for VoltioError {
    fn from(err: reqwest::Error) -> Self {
        VoltioError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for VoltioError {
    fn from(err: serde_json::Error) -> Self {
        VoltioError::Transport(format!("payload decode failed: {}", err))
    }
}
