//! Error types for the RouteGrid state store.

use thiserror::Error;

/// Result type alias for state store operations.
pub type StateResult<T> = Result<T, StateError>;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to open policy store: {0}")]
    Open(String),

    /// Any transaction, table, read or write failure inside redb.
    #[error("policy store error: {0}")]
    Storage(String),

    #[error("failed to encode value: {0}")]
    Encode(String),

    /// A stored row could not be decoded.
    #[error("corrupt row {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("timed out acquiring lock on {0}")]
    LockTimeout(String),
}

impl StateError {
    pub(crate) fn corrupt(key: &str, reason: impl ToString) -> Self {
        StateError::Corrupt {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| $crate::error::StateError::$variant(e.to_string())
    };
}

pub(crate) use map_err;
