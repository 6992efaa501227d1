//! Errors surfaced to callers of the engine.

use crate::db::DbError;
use thiserror::Error;

/// Engine error types
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Storage error: {0}")]
    Storage(DbError),

    #[error("Card not found: {0}")]
    CardNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Engine unavailable")]
    Unavailable,
}

impl From<DbError> for EngineError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::CardNotFound(id) => Self::CardNotFound(id),
            other => Self::Storage(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
