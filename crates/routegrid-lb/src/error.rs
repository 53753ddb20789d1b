//! Error types for load-balancer discovery.

use routegrid_core::ZoneId;
use thiserror::Error;

pub type SourceResult<T> = Result<T, SourceError>;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no config server known for zone {0}")]
    UnknownZone(ZoneId),

    #[error("connecting to {address}: {reason}")]
    Connect { address: String, reason: String },

    #[error("request to {address} failed: {reason}")]
    Request { address: String, reason: String },

    #[error("{address} responded with status {status}")]
    Status { address: String, status: u16 },

    #[error("request to {address} timed out")]
    Timeout { address: String },

    #[error("invalid load balancer response: {0}")]
    Decode(String),

    #[error("zone {0} unavailable")]
    Unavailable(ZoneId),
}
