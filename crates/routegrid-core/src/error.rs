//! Error types for the RouteGrid data model.

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while parsing identifiers and configuration values.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid application id '{0}': expected tenant:application:instance")]
    InvalidApplicationId(String),

    #[error("invalid zone id '{0}': expected environment.region")]
    InvalidZoneId(String),

    #[error("unknown system '{0}'")]
    UnknownSystem(String),

    #[error("invalid duration '{0}'")]
    InvalidDuration(String),
}
