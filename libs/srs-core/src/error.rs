//! Error types for srs-core.

use thiserror::Error;

/// Result type alias using CoreError.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised when decoding domain values from external input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid rating {0}, expected 1-4")]
    InvalidRating(u8),

    #[error("unknown card state {0}")]
    UnknownState(i64),

    #[error("unknown card type: {0}")]
    UnknownCardType(String),
}
