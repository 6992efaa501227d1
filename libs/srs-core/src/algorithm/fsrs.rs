//! FSRS (Free Spaced Repetition Scheduler) memory model.
//!
//! Modern algorithm based on memory research using DSR model:
//! - Difficulty (D): Card difficulty 1-10
//! - Stability (S): Days until retention drops to target
//! - Retrievability (R): Probability of recall
//!
//! New and lapsed cards go through short learning steps measured in minutes
//! before graduating to day-based review intervals.

use super::{MemoryModel, ModelLog, Scheduled};
use crate::types::{Card, CardState, Rating};
use chrono::{DateTime, Duration, Utc};

/// FSRS model with configurable parameters.
#[derive(Debug, Clone)]
pub struct Fsrs {
    pub request_retention: f64,
    pub maximum_interval: f64,
    /// FSRS-4.5 parameters (17 weights).
    pub w: [f64; 17],
    /// Minutes until a new card returns after Again, Hard, Good.
    pub learning_steps: [i64; 3],
    /// Minutes until a (re)learning card returns after Again, Hard.
    pub relearning_steps: [i64; 2],
}

impl Default for Fsrs {
    fn default() -> Self {
        Self {
            request_retention: 0.9,
            maximum_interval: 36500.0,
            w: [
                0.4, 0.6, 2.4, 5.8, // w[0-3]: initial stability for Again, Hard, Good, Easy
                4.93,  // w[4]: initial difficulty base
                0.94,  // w[5]: initial difficulty modifier
                0.86,  // w[6]: difficulty decay
                0.01,  // w[7]: mean reversion weight
                1.49,  // w[8]: stability exp base
                0.14,  // w[9]: stability decay
                0.94,  // w[10]: retrievability effect
                2.18,  // w[11]: forget stability base
                0.05,  // w[12]: difficulty on forget
                0.34,  // w[13]: stability on forget
                1.26,  // w[14]: retrievability on forget
                0.29,  // w[15]: hard penalty
                2.61,  // w[16]: easy bonus
            ],
            learning_steps: [1, 5, 10],
            relearning_steps: [5, 10],
        }
    }
}

impl MemoryModel for Fsrs {
    fn name(&self) -> &'static str {
        "fsrs"
    }

    fn request_retention(&self) -> f64 {
        self.request_retention
    }

    fn set_request_retention(&mut self, retention: f64) {
        self.request_retention = retention;
    }

    fn apply(&self, card: &Card, rating: Rating, now: DateTime<Utc>) -> Scheduled {
        let rating_value = rating.to_value();
        let elapsed = card
            .last_review
            .map(|last| Self::elapsed_days(last, now))
            .unwrap_or(0.0);

        let (stability, difficulty) = if card.state == CardState::New || card.reps == 0 {
            (
                self.initial_stability(rating_value),
                self.initial_difficulty(rating_value),
            )
        } else {
            self.next_memory_state(card, rating_value, elapsed)
        };

        let state = Self::determine_state(card.state, rating);
        let (due, scheduled_days) = if state.is_learning() {
            let minutes = self.step_minutes(card.state, rating);
            (now + Duration::minutes(minutes), 0)
        } else {
            let days = self.interval_from_stability(stability).round() as u32;
            (now + Duration::days(i64::from(days)), days)
        };

        let elapsed_days = elapsed.floor() as u32;
        Scheduled {
            card: Card {
                state,
                due,
                stability,
                difficulty,
                elapsed_days,
                scheduled_days,
                reps: card.reps + 1,
                last_review: Some(now),
                ..card.clone()
            },
            log: ModelLog {
                rating,
                previous_state: card.state,
                review_time: now,
                elapsed_days,
                scheduled_days,
            },
        }
    }
}

impl Fsrs {
    /// Model with a custom retention target and default weights.
    pub fn with_retention(request_retention: f64) -> Self {
        Self {
            request_retention,
            ..Self::default()
        }
    }

    /// Calculate initial stability for a new card based on first rating.
    /// S0(G) = w[G-1] where G is rating 1-4
    fn initial_stability(&self, rating: u8) -> f64 {
        let index = (rating.saturating_sub(1)) as usize;
        self.w[index.min(3)].max(0.1)
    }

    /// Calculate initial difficulty for a new card based on first rating.
    /// D0(G) = w[4] - w[5] * (G - 3)
    fn initial_difficulty(&self, rating: u8) -> f64 {
        let d0 = self.w[4] - self.w[5] * (rating as f64 - 3.0);
        d0.clamp(1.0, 10.0)
    }

    /// Calculate next difficulty using mean reversion.
    /// D' = w[7] * D0(G) + (1 - w[7]) * D
    /// Apply decay: D'' = D' - w[6] * (G - 3)
    fn next_difficulty(&self, current_d: f64, rating: u8) -> f64 {
        let d0 = self.initial_difficulty(rating);
        let d_new = self.w[7] * d0 + (1.0 - self.w[7]) * current_d;
        let d_decayed = d_new - self.w[6] * (rating as f64 - 3.0);
        d_decayed.clamp(1.0, 10.0)
    }

    /// Calculate retrievability (probability of recall).
    /// R = (1 + t / (9 * S))^(-1)
    fn retrievability(&self, elapsed_days: f64, stability: f64) -> f64 {
        if stability <= 0.0 {
            return 0.0;
        }
        let factor = 1.0 + elapsed_days / (9.0 * stability);
        factor.powf(-1.0)
    }

    /// Calculate next stability after successful recall.
    /// S' = S * (e^(w[8]) * (11 - D) * S^(-w[9]) * (e^(w[10]*(1-R)) - 1) + 1) * modifier
    fn next_stability_recall(
        &self,
        stability: f64,
        difficulty: f64,
        retrievability: f64,
        rating: u8,
    ) -> f64 {
        let exp_w8 = self.w[8].exp();
        let d_factor = (11.0 - difficulty).max(0.1);
        let s_decay = stability.powf(-self.w[9]);
        let r_factor = (self.w[10] * (1.0 - retrievability)).exp() - 1.0;

        let growth = exp_w8 * d_factor * s_decay * r_factor + 1.0;

        let modifier = match rating {
            2 => self.w[15], // Hard penalty
            4 => self.w[16], // Easy bonus
            _ => 1.0,
        };

        let new_s = stability * growth * modifier;
        new_s.max(0.1).min(self.maximum_interval)
    }

    /// Calculate next stability after forgetting (lapse).
    /// S' = w[11] * D^(-w[12]) * ((S+1)^w[13] - 1) * e^(w[14]*(1-R))
    fn next_stability_forget(
        &self,
        stability: f64,
        difficulty: f64,
        retrievability: f64,
    ) -> f64 {
        let d_factor = difficulty.max(1.0).powf(-self.w[12]);
        let s_factor = (stability + 1.0).powf(self.w[13]) - 1.0;
        let r_factor = (self.w[14] * (1.0 - retrievability)).exp();

        let new_s = self.w[11] * d_factor * s_factor * r_factor;
        // Never exceed previous stability on lapse
        new_s.max(0.1).min(stability)
    }

    /// Calculate optimal interval from stability.
    /// I = 9 * S * (1/R - 1) where R = request_retention
    fn interval_from_stability(&self, stability: f64) -> f64 {
        if self.request_retention <= 0.0 || self.request_retention >= 1.0 {
            return stability.max(1.0).min(self.maximum_interval);
        }
        let interval = 9.0 * stability * (1.0 / self.request_retention - 1.0);
        interval.max(1.0).min(self.maximum_interval)
    }

    /// Minutes until a card in a learning step is shown again.
    fn step_minutes(&self, previous: CardState, rating: Rating) -> i64 {
        match (previous, rating) {
            (CardState::New, Rating::Again) => self.learning_steps[0],
            (CardState::New, Rating::Hard) => self.learning_steps[1],
            (CardState::New, _) => self.learning_steps[2],
            (_, Rating::Again) => self.relearning_steps[0],
            _ => self.relearning_steps[1],
        }
    }

    /// Fractional days since the last review.
    fn elapsed_days(last_review: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        let elapsed = now.signed_duration_since(last_review);
        (elapsed.num_seconds() as f64 / 86400.0).max(0.0)
    }

    /// Determine new state based on current state and rating.
    fn determine_state(current: CardState, rating: Rating) -> CardState {
        match (current, rating) {
            (CardState::New, Rating::Easy) => CardState::Review,
            (CardState::New, _) => CardState::Learning,
            (CardState::Learning, Rating::Again | Rating::Hard) => CardState::Learning,
            (CardState::Learning, _) => CardState::Review,
            (CardState::Review, Rating::Again) => CardState::Relearning,
            (CardState::Review, _) => CardState::Review,
            (CardState::Relearning, Rating::Again | Rating::Hard) => CardState::Relearning,
            (CardState::Relearning, _) => CardState::Review,
        }
    }

    /// Update stability and difficulty for a card that has been reviewed before.
    fn next_memory_state(&self, card: &Card, rating: u8, elapsed: f64) -> (f64, f64) {
        let current_s = if card.stability > 0.0 { card.stability } else { 1.0 };
        let current_d = if card.difficulty > 0.0 { card.difficulty } else { 5.0 };

        let r = self.retrievability(elapsed, current_s);
        let new_d = self.next_difficulty(current_d, rating);
        let new_s = if rating == 1 {
            self.next_stability_forget(current_s, current_d, r)
        } else {
            self.next_stability_recall(current_s, current_d, r, rating)
        };
        (new_s, new_d)
    }
}
