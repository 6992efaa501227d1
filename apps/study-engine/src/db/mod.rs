//! Local SQLite persistence: card store, review log, undo slot, scores and activity.

pub mod error;
pub mod repository;
pub mod schema;

pub use error::DbError;
pub use repository::{
    ActivityRepository, CardRepository, CardScope, MetaRepository, ParamsRepository,
    ReviewLogRepository, ScoreRepository, SqliteRepository, UndoRepository, UndoSnapshot,
};
