//! Database error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("card not found: {0}")]
    CardNotFound(String),

    #[error("database schema version {db_version} is newer than supported version {latest_supported}")]
    UnsupportedSchemaVersion { db_version: u32, latest_supported: u32 },

    #[error("undo snapshot encoding: {0}")]
    Snapshot(#[from] serde_json::Error),
}
