//! Study engine: card scheduling and review persistence.
//!
//! All state lives in one SQLite database owned by a single worker thread.
//! Use [`Engine`] to talk to it.

pub mod clock;
pub mod config;
pub mod counters;
pub mod db;
pub mod error;
pub mod gateway;
pub mod scheduler;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, EngineConfig};
pub use error::{EngineError, Result};
pub use gateway::Engine;
pub use scheduler::IntervalPreview;

pub use srs_core::{
    ActivityEvent, Card, CardRef, CardState, CardType, DueCounts, Rating, ReviewLogEntry,
    ReviewOutcome, SectionScore,
};
