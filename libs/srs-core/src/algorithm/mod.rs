//! Memory model abstraction.

pub mod fsrs;

use crate::types::{Card, CardState, Rating};
use chrono::{DateTime, Utc};

/// Scheduling details produced alongside the updated card.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelLog {
    pub rating: Rating,
    pub previous_state: CardState,
    pub review_time: DateTime<Utc>,
    pub elapsed_days: u32,
    pub scheduled_days: u32,
}

/// Result of applying one rating to a card.
#[derive(Debug, Clone, PartialEq)]
pub struct Scheduled {
    pub card: Card,
    pub log: ModelLog,
}

/// Outcomes for all four ratings, computed without committing any.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingPreview {
    pub again: Scheduled,
    pub hard: Scheduled,
    pub good: Scheduled,
    pub easy: Scheduled,
}

impl RatingPreview {
    pub fn get(&self, rating: Rating) -> &Scheduled {
        match rating {
            Rating::Again => &self.again,
            Rating::Hard => &self.hard,
            Rating::Good => &self.good,
            Rating::Easy => &self.easy,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Rating, &Scheduled)> {
        Rating::ALL.into_iter().map(move |rating| (rating, self.get(rating)))
    }
}

/// A spaced-repetition memory model.
///
/// Implementations are pure: the same `(card, rating, now)` always yields the
/// same result for a given retention target. They update `state`, `due`,
/// `stability`, `difficulty`, `reps`, `elapsed_days`, `scheduled_days` and
/// `last_review`; lapse counting and the suspend/bury/leech flags belong to
/// the scheduler.
pub trait MemoryModel: Send {
    /// Model identifier.
    fn name(&self) -> &'static str;

    /// Compute the card after `rating` at `now`.
    fn apply(&self, card: &Card, rating: Rating, now: DateTime<Utc>) -> Scheduled;

    /// Target probability of recall at the due date.
    fn request_retention(&self) -> f64;

    fn set_request_retention(&mut self, retention: f64);

    /// Outcomes for every rating.
    fn preview(&self, card: &Card, now: DateTime<Utc>) -> RatingPreview {
        RatingPreview {
            again: self.apply(card, Rating::Again, now),
            hard: self.apply(card, Rating::Hard, now),
            good: self.apply(card, Rating::Good, now),
            easy: self.apply(card, Rating::Easy, now),
        }
    }
}
