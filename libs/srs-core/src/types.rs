//! Core types for card scheduling.

use crate::error::{CoreError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Scheduling phase of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardState {
    New,
    Learning,
    Review,
    Relearning,
}

impl Default for CardState {
    fn default() -> Self {
        Self::New
    }
}

impl CardState {
    /// Numeric code stored in the database (0-3).
    pub fn to_value(self) -> i64 {
        match self {
            Self::New => 0,
            Self::Learning => 1,
            Self::Review => 2,
            Self::Relearning => 3,
        }
    }

    /// Decode the stored numeric code.
    pub fn from_value(value: i64) -> Result<Self> {
        match value {
            0 => Ok(Self::New),
            1 => Ok(Self::Learning),
            2 => Ok(Self::Review),
            3 => Ok(Self::Relearning),
            other => Err(CoreError::UnknownState(other)),
        }
    }

    /// Learning or Relearning: short-interval steps.
    pub fn is_learning(self) -> bool {
        matches!(self, Self::Learning | Self::Relearning)
    }
}

/// Learner's self-assessed recall quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

impl Rating {
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    /// Convert to 4-point numeric value (1-4).
    pub fn to_value(self) -> u8 {
        match self {
            Self::Again => 1,
            Self::Hard => 2,
            Self::Good => 3,
            Self::Easy => 4,
        }
    }

    /// Create from 4-point numeric value.
    pub fn from_value(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Self::Again),
            2 => Ok(Self::Hard),
            3 => Ok(Self::Good),
            4 => Ok(Self::Easy),
            other => Err(CoreError::InvalidRating(other)),
        }
    }

    /// Anything but Again counts as a correct recall.
    pub fn is_correct(self) -> bool {
        self != Self::Again
    }

    /// Derive a rating from answer correctness and response time.
    ///
    /// Wrong answers are always Again; correct answers are graded by how long
    /// the learner took: 59s or more is Again, 40s Hard, 8s Good, faster Easy.
    pub fn from_response(correct: bool, elapsed: Duration) -> Self {
        if !correct {
            return Self::Again;
        }
        match elapsed.as_secs() {
            59.. => Self::Again,
            40..=58 => Self::Hard,
            8..=39 => Self::Good,
            _ => Self::Easy,
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Again => "again",
            Self::Hard => "hard",
            Self::Good => "good",
            Self::Easy => "easy",
        };
        f.write_str(label)
    }
}

/// Kind of reviewable item sharing the card table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardType {
    Mcq,
    Passage,
    Flashcard,
}

impl CardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mcq => "mcq",
            Self::Passage => "passage",
            Self::Flashcard => "flashcard",
        }
    }
}

impl FromStr for CardType {
    type Err = CoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "mcq" => Ok(Self::Mcq),
            "passage" => Ok(Self::Passage),
            "flashcard" => Ok(Self::Flashcard),
            other => Err(CoreError::UnknownCardType(other.to_string())),
        }
    }
}

/// Persistent scheduling record for one reviewable item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub card_id: String,
    pub project_id: String,
    pub section_id: String,
    pub card_type: CardType,
    pub state: CardState,
    pub due: DateTime<Utc>,
    pub stability: f64,
    pub difficulty: f64,
    pub elapsed_days: u32,
    pub scheduled_days: u32,
    pub reps: u32,
    pub lapses: u32,
    pub last_review: Option<DateTime<Utc>>,
    pub suspended: bool,
    pub buried: bool,
    pub leech: bool,
}

impl Card {
    /// A never-reviewed card, as created on first reference.
    pub fn new(
        card_id: impl Into<String>,
        project_id: impl Into<String>,
        section_id: impl Into<String>,
        card_type: CardType,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            card_id: card_id.into(),
            project_id: project_id.into(),
            section_id: section_id.into(),
            card_type,
            state: CardState::New,
            due: now,
            stability: 0.0,
            difficulty: 0.0,
            elapsed_days: 0,
            scheduled_days: 0,
            reps: 0,
            lapses: 0,
            last_review: None,
            suspended: false,
            buried: false,
            leech: false,
        }
    }

    /// Not hidden by suspend or bury.
    pub fn is_eligible(&self) -> bool {
        !self.suspended && !self.buried
    }

    /// Reviewed at least once and due at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.state != CardState::New && self.due <= now
    }
}

/// Identifies an item supplied by the content layer when a project loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRef {
    pub card_id: String,
    pub section_id: String,
    pub card_type: CardType,
}

/// One rating event, immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewLogEntry {
    pub id: String,
    pub card_id: String,
    pub project_id: String,
    pub section_id: String,
    pub rating: Rating,
    pub review_time: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub new_state: CardState,
    pub new_stability: f64,
    pub new_difficulty: f64,
    pub scheduled_days: u32,
}

/// Correct/attempted counters for one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionScore {
    pub project_id: String,
    pub section_id: String,
    pub correct: u32,
    pub attempted: u32,
}

/// One recorded rating for the trend display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub id: String,
    pub project_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,
    pub rating: Rating,
    pub correct: bool,
    pub timestamp: DateTime<Utc>,
}

/// Due/new/total counts over a set of sections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueCounts {
    pub due: u32,
    pub new_count: u32,
    pub total: u32,
}

/// Result of a review transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub card_id: String,
    pub state: CardState,
    pub due: DateTime<Utc>,
    pub stability: f64,
    pub difficulty: f64,
    pub lapses: u32,
    pub is_leech: bool,
}
