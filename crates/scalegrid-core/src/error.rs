//! Error types for ScaleGrid core.

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while loading configuration or parsing core enums.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to read config: {0}")]
    Read(String),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("unknown scaling strategy: {0}")]
    UnknownStrategy(String),

    #[error("unknown scaling action: {0}")]
    UnknownAction(String),
}
