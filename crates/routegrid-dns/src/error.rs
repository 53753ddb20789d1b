//! Error types for DNS record forwarding.

use routegrid_core::RecordName;
use routegrid_state::StateError;
use thiserror::Error;

pub type ForwardResult<T> = Result<T, ForwardError>;

/// A request could not be handed over for dispatch.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("name service queue is full, dropped request for {0}")]
    QueueFull(RecordName),

    #[error("forwarder unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    State(#[from] StateError),
}

pub type NameServiceResult<T> = Result<T, NameServiceError>;

/// A DNS provider failed to apply a request.
#[derive(Debug, Error)]
pub enum NameServiceError {
    #[error("provider rejected change to {name}: {reason}")]
    Rejected { name: RecordName, reason: String },

    #[error(transparent)]
    State(#[from] StateError),
}
