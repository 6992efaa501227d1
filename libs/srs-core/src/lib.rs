//! Core scheduling library for the study engine.
//!
//! Provides:
//! - Card, review log, score and activity types shared by storage and scheduler
//! - The memory model abstraction and its FSRS implementation
//! - Leech cadence, interval labels and the activity trend score

pub mod activity;
pub mod algorithm;
pub mod error;
pub mod format;
pub mod leech;
pub mod types;

pub use activity::activity_score;
pub use algorithm::{MemoryModel, ModelLog, RatingPreview, Scheduled};
pub use error::{CoreError, Result};
pub use format::interval_label;
pub use leech::is_leech;
pub use types::{
    ActivityEvent, Card, CardRef, CardState, CardType, DueCounts, Rating, ReviewLogEntry,
    ReviewOutcome, SectionScore,
};
