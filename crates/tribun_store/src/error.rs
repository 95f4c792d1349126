//! Error types for store operations.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// HTTP status the store answers with when a transaction holds too many operations.
pub const STATUS_TOO_LARGE: u16 = 413;

/// HTTP status the store answers with when a transaction cannot be applied.
pub const STATUS_CONFLICT: u16 = 409;

/// Errors that can occur while talking to the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store rejected the transaction.
    #[error("store returned status {code}: {body}")]
    Status {
        /// Status code of the response.
        code: u16,
        /// Raw response body.
        body: String,
    },

    /// The request never reached the store or the response was lost.
    #[error("transport error: {0}")]
    Transport(String),

    /// A request or response body was not valid JSON for the transaction model.
    #[error("invalid transaction payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The client configuration cannot produce a valid request.
    #[error("invalid store configuration: {0}")]
    Config(String),

    /// A value could not be decoded from base64 text.
    #[error("cannot decode value: {0}")]
    Decode(String),
}

impl StoreError {
    /// Creates a status error.
    pub fn status(code: u16, body: impl Into<String>) -> Self {
        Self::Status {
            code,
            body: body.into(),
        }
    }

    /// Returns true if the store refused the transaction for being too large.
    pub fn is_too_large(&self) -> bool {
        matches!(self, Self::Status { code, .. } if *code == STATUS_TOO_LARGE)
    }

    /// Returns true if the store reported a transaction conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Status { code, .. } if *code == STATUS_CONFLICT)
    }

    /// Extracts the keys reported as absent by a conflict response.
    ///
    /// Returns `None` when this is not a conflict, or when the body does not
    /// carry the transaction error list.
    pub fn missing_keys(&self) -> Option<Vec<String>> {
        match self {
            Self::Status { code, body } if *code == STATUS_CONFLICT => {
                crate::txn::missing_keys(body).ok()
            }
            _ => None,
        }
    }
}
