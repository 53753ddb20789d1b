//! Error types for the routing policy maintainer.

use routegrid_state::StateError;
use thiserror::Error;

pub type MaintainerResult<T> = Result<T, MaintainerError>;

/// A failure that aborts one maintenance phase.
#[derive(Debug, Error)]
pub enum MaintainerError {
    #[error("policy store: {0}")]
    State(#[from] StateError),
}
