//! Next-card selection and the review transaction.
//!
//! The scheduler owns the memory model and the day-scoped New-card quota.
//! Every write it makes goes through one repository transaction, so a card
//! update, its review log entry and the undo slot always move together.

pub mod day;
pub mod selection;

pub use day::{study_day, DayState};
pub use selection::{Pick, Tier};

use crate::config::EngineConfig;
use crate::db::{
    CardRepository, CardScope, DbError, MetaRepository, ParamsRepository, ReviewLogRepository,
    ScoreRepository, SqliteRepository, UndoRepository, UndoSnapshot,
};
use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use srs_core::algorithm::fsrs::Fsrs;
use srs_core::{
    interval_label, is_leech, CardRef, CardState, MemoryModel, Rating, ReviewLogEntry,
    ReviewOutcome, Scheduled,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const DAY_STATE_KEY: &str = "day_state";

/// Projected outcome of one rating, for display before the learner commits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalPreview {
    pub rating: Rating,
    pub state: CardState,
    pub due: DateTime<Utc>,
    pub interval_days: f64,
    pub label: String,
}

pub struct Scheduler {
    model: Box<dyn MemoryModel>,
    day: DayState,
    leech_threshold: u32,
    daily_reset_hour: u32,
    default_retention: f64,
    rng: StdRng,
}

impl Scheduler {
    /// FSRS scheduler configured from `config`.
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_model(Box::new(Fsrs::with_retention(config.request_retention)), config)
    }

    pub fn with_model(model: Box<dyn MemoryModel>, config: &EngineConfig) -> Self {
        Self {
            model,
            day: DayState::default(),
            leech_threshold: config.leech_threshold,
            daily_reset_hour: config.daily_reset_hour,
            default_retention: config.request_retention,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic New-card choice, for tests.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn model_name(&self) -> &'static str {
        self.model.name()
    }

    pub fn day_state(&self) -> DayState {
        self.day
    }

    /// Reload the persisted day state.
    pub fn restore(&mut self, repo: &SqliteRepository) -> Result<()> {
        if let Some(raw) = repo.get_meta(DAY_STATE_KEY)? {
            match DayState::decode(&raw) {
                Some(state) => self.day = state,
                None => warn!(value = %raw, "ignoring malformed day state"),
            }
        }
        Ok(())
    }

    /// Start a new study day if `now` has crossed the boundary: unbury every
    /// card and reset the New-card counter. Returns true on rollover.
    pub fn roll_day(&mut self, repo: &SqliteRepository, now: DateTime<Utc>) -> Result<bool> {
        let today = study_day(now, self.daily_reset_hour);
        let mut next = self.day;
        if !next.roll(today) {
            return Ok(false);
        }

        let unburied = repo.transaction(|tx| {
            let count = tx.unbury_all(None)?;
            persist_day(tx, &next)?;
            Ok(count)
        })?;
        self.day = next;
        info!(%today, unburied, "study day rolled over");
        Ok(true)
    }

    /// Register a project's sections and cards. Existing rows are left alone.
    /// Returns the number of cards created.
    pub fn load_project(
        &mut self,
        repo: &SqliteRepository,
        project_id: &str,
        sections: &[String],
        cards: &[CardRef],
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let created = repo.transaction(|tx| {
            for section_id in sections {
                tx.ensure_score(project_id, section_id)?;
            }
            let mut created = 0;
            for card in cards {
                if tx.ensure_card(project_id, card, now)? {
                    created += 1;
                }
            }
            Ok(created)
        })?;
        self.sync_retention(repo, project_id)?;

        info!(
            project_id,
            sections = sections.len(),
            cards = cards.len(),
            created,
            "project loaded"
        );
        Ok(created)
    }

    /// Next card to show, or None when the scope has nothing eligible.
    pub fn pick_next(
        &mut self,
        repo: &SqliteRepository,
        scope: &CardScope<'_>,
        new_cap: u32,
        now: DateTime<Utc>,
    ) -> Result<Option<String>> {
        let allow_new = self.day.under_cap(new_cap);
        let Some(pick) = selection::select(repo, scope, allow_new, &mut self.rng, now)? else {
            debug!(project_id = scope.project_id, "no eligible card");
            return Ok(None);
        };

        if pick.tier == Tier::New {
            let mut next = self.day;
            next.record_new();
            persist_day(repo, &next)?;
            self.day = next;
        }

        debug!(
            card_id = %pick.card_id,
            tier = ?pick.tier,
            new_today = self.day.new_today,
            "picked card"
        );
        Ok(Some(pick.card_id))
    }

    /// Projected due date and label for each rating. Nothing is written.
    pub fn preview(
        &mut self,
        repo: &SqliteRepository,
        card_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<IntervalPreview>> {
        let card = repo
            .get_card(card_id)?
            .ok_or_else(|| EngineError::CardNotFound(card_id.to_string()))?;
        self.sync_retention(repo, &card.project_id)?;

        let previews = self.model.preview(&card, now);
        Ok(previews
            .iter()
            .map(|(rating, scheduled)| {
                let interval_days = (scheduled.card.due - now).num_seconds() as f64 / 86_400.0;
                IntervalPreview {
                    rating,
                    state: scheduled.card.state,
                    due: scheduled.card.due,
                    interval_days,
                    label: interval_label(interval_days),
                }
            })
            .collect())
    }

    /// Apply `rating` to a card, creating it first if it has never been seen.
    ///
    /// The card update, review log entry and undo snapshot commit together or
    /// not at all.
    pub fn review(
        &mut self,
        repo: &SqliteRepository,
        project_id: &str,
        card: &CardRef,
        rating: Rating,
        elapsed_ms: u64,
        now: DateTime<Utc>,
    ) -> Result<ReviewOutcome> {
        self.sync_retention(repo, project_id)?;
        let model = &self.model;
        let threshold = self.leech_threshold;

        let result = repo.transaction(|tx| {
            tx.ensure_card(project_id, card, now)?;
            let before = tx
                .get_card(&card.card_id)?
                .ok_or_else(|| DbError::CardNotFound(card.card_id.clone()))?;

            let Scheduled { card: mut after, log } = model.apply(&before, rating, now);

            let lapsed = rating == Rating::Again
                && matches!(log.previous_state, CardState::Review | CardState::Relearning);
            if lapsed {
                after.lapses += 1;
            }
            let flagged = is_leech(after.lapses, threshold);
            if flagged {
                after.leech = true;
            }

            let entry = ReviewLogEntry {
                id: Uuid::now_v7().to_string(),
                card_id: after.card_id.clone(),
                project_id: after.project_id.clone(),
                section_id: after.section_id.clone(),
                rating,
                review_time: now,
                elapsed_ms,
                new_state: after.state,
                new_stability: after.stability,
                new_difficulty: after.difficulty,
                scheduled_days: log.scheduled_days,
            };

            tx.save_undo(&UndoSnapshot {
                card: before,
                review_log_id: entry.id.clone(),
            })?;
            tx.save_card(&after)?;
            tx.append_review(&entry)?;

            Ok(ReviewOutcome {
                card_id: after.card_id,
                state: after.state,
                due: after.due,
                stability: after.stability,
                difficulty: after.difficulty,
                lapses: after.lapses,
                is_leech: flagged,
            })
        });

        match result {
            Ok(outcome) => {
                if outcome.is_leech {
                    warn!(card_id = %outcome.card_id, lapses = outcome.lapses, "card flagged as leech");
                }
                debug!(
                    card_id = %outcome.card_id,
                    %rating,
                    state = ?outcome.state,
                    due = %outcome.due,
                    "review recorded"
                );
                Ok(outcome)
            }
            Err(e) => {
                error!(card_id = %card.card_id, error = %e, "review aborted");
                Err(e.into())
            }
        }
    }

    /// Roll back the most recent review. Returns the restored card id, or
    /// None when there is nothing to undo.
    pub fn undo(&mut self, repo: &SqliteRepository) -> Result<Option<String>> {
        let restored = repo.transaction(|tx| {
            let Some(snapshot) = tx.load_undo()? else {
                return Ok(None);
            };
            tx.save_card(&snapshot.card)?;
            if !tx.delete_review(&snapshot.review_log_id)? {
                warn!(review_log_id = %snapshot.review_log_id, "undo found no paired review log entry");
            }
            tx.clear_undo()?;
            Ok(Some(snapshot.card.card_id))
        })?;

        match &restored {
            Some(card_id) => debug!(%card_id, "review undone"),
            None => debug!("nothing to undo"),
        }
        Ok(restored)
    }

    pub fn suspend(&self, repo: &SqliteRepository, card_id: &str) -> Result<()> {
        repo.set_suspended(card_id, true)?;
        debug!(card_id, "card suspended");
        Ok(())
    }

    pub fn unsuspend(&self, repo: &SqliteRepository, card_id: &str) -> Result<()> {
        repo.set_suspended(card_id, false)?;
        debug!(card_id, "card unsuspended");
        Ok(())
    }

    pub fn bury(&self, repo: &SqliteRepository, card_id: &str) -> Result<()> {
        repo.set_buried(card_id, true)?;
        debug!(card_id, "card buried");
        Ok(())
    }

    pub fn unbury_all(&self, repo: &SqliteRepository, project_id: &str) -> Result<usize> {
        let count = repo.unbury_all(Some(project_id))?;
        debug!(project_id, count, "cards unburied");
        Ok(count)
    }

    /// Stored retention target for a project, or the configured default.
    pub fn retention(&self, repo: &SqliteRepository, project_id: &str) -> Result<f64> {
        Ok(repo.retention(project_id)?.unwrap_or(self.default_retention))
    }

    pub fn set_retention(
        &mut self,
        repo: &SqliteRepository,
        project_id: &str,
        retention: f64,
    ) -> Result<()> {
        if !(retention > 0.0 && retention < 1.0) {
            return Err(EngineError::InvalidInput(format!(
                "retention must be in (0, 1), got {retention}"
            )));
        }
        repo.set_retention(project_id, retention)?;
        self.model.set_request_retention(retention);
        info!(project_id, retention, "retention updated");
        Ok(())
    }

    fn sync_retention(&mut self, repo: &SqliteRepository, project_id: &str) -> Result<()> {
        let retention = self.retention(repo, project_id)?;
        if (self.model.request_retention() - retention).abs() > f64::EPSILON {
            self.model.set_request_retention(retention);
        }
        Ok(())
    }
}

fn persist_day(repo: &SqliteRepository, state: &DayState) -> std::result::Result<(), DbError> {
    match state.encode() {
        Some(raw) => repo.set_meta(DAY_STATE_KEY, &raw),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use srs_core::CardType;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap()
    }

    fn card(id: &str) -> CardRef {
        CardRef {
            card_id: id.to_string(),
            section_id: "s1".to_string(),
            card_type: CardType::Flashcard,
        }
    }

    fn setup() -> (SqliteRepository, Scheduler) {
        let repo = SqliteRepository::open_in_memory().unwrap();
        let scheduler = Scheduler::new(&EngineConfig::default()).with_seed(1);
        (repo, scheduler)
    }

    #[test]
    fn first_review_leaves_new() {
        let (repo, mut scheduler) = setup();
        let outcome = scheduler
            .review(&repo, "proj", &card("x"), Rating::Good, 5000, start())
            .unwrap();

        assert_eq!(outcome.state, CardState::Learning);
        assert_eq!(outcome.lapses, 0);
        assert!(!outcome.is_leech);

        let stored = repo.get_card("x").unwrap().unwrap();
        assert_eq!(stored.reps, 1);
        assert_eq!(repo.reviews_for_card("x").unwrap().len(), 1);
    }

    #[test]
    fn again_on_review_card_counts_a_lapse() {
        let (repo, mut scheduler) = setup();
        let now = start();
        scheduler.review(&repo, "proj", &card("x"), Rating::Easy, 0, now).unwrap();
        let later = repo.get_card("x").unwrap().unwrap().due;

        let outcome = scheduler
            .review(&repo, "proj", &card("x"), Rating::Again, 0, later)
            .unwrap();
        assert_eq!(outcome.state, CardState::Relearning);
        assert_eq!(outcome.lapses, 1);
    }

    #[test]
    fn again_on_new_card_is_not_a_lapse() {
        let (repo, mut scheduler) = setup();
        let outcome = scheduler
            .review(&repo, "proj", &card("x"), Rating::Again, 0, start())
            .unwrap();
        assert_eq!(outcome.lapses, 0);
    }

    #[test]
    fn leech_flag_follows_cadence() {
        let (repo, mut scheduler) = setup();
        let mut now = start();
        scheduler.review(&repo, "proj", &card("y"), Rating::Easy, 0, now).unwrap();

        let mut flagged_at = Vec::new();
        for _ in 0..12 {
            now += Duration::days(30);
            let outcome = scheduler
                .review(&repo, "proj", &card("y"), Rating::Again, 0, now)
                .unwrap();
            if outcome.is_leech {
                flagged_at.push(outcome.lapses);
            }
        }

        assert_eq!(flagged_at, vec![8, 12]);
        assert!(repo.get_card("y").unwrap().unwrap().leech);
    }

    #[test]
    fn undo_restores_card_and_removes_one_log_entry() {
        let (repo, mut scheduler) = setup();
        scheduler.review(&repo, "proj", &card("x"), Rating::Good, 0, start()).unwrap();
        let before = repo.get_card("x").unwrap().unwrap();

        scheduler
            .review(&repo, "proj", &card("x"), Rating::Good, 0, start() + Duration::minutes(10))
            .unwrap();
        assert_eq!(scheduler.undo(&repo).unwrap().as_deref(), Some("x"));

        assert_eq!(repo.get_card("x").unwrap().unwrap(), before);
        assert_eq!(repo.reviews_for_card("x").unwrap().len(), 1);
        assert_eq!(scheduler.undo(&repo).unwrap(), None);
    }

    #[test]
    fn new_cards_respect_daily_cap() {
        let (repo, mut scheduler) = setup();
        let cards: Vec<CardRef> = ["a", "b", "c"].iter().map(|id| card(id)).collect();
        let sections = vec!["s1".to_string()];
        scheduler.load_project(&repo, "proj", &sections, &cards, start()).unwrap();
        scheduler.roll_day(&repo, start()).unwrap();

        let scope = CardScope::new("proj", &sections);
        scheduler.pick_next(&repo, &scope, 2, start()).unwrap();
        scheduler.pick_next(&repo, &scope, 2, start()).unwrap();
        assert_eq!(scheduler.day_state().new_today, 2);

        scheduler.pick_next(&repo, &scope, 2, start()).unwrap();
        assert_eq!(scheduler.day_state().new_today, 2);
    }

    #[test]
    fn rollover_unburies_and_resets_counter() {
        let (repo, mut scheduler) = setup();
        let sections = vec!["s1".to_string()];
        scheduler
            .load_project(&repo, "proj", &sections, &[card("a")], start())
            .unwrap();
        scheduler.roll_day(&repo, start()).unwrap();
        let scope = CardScope::new("proj", &sections);
        scheduler.pick_next(&repo, &scope, 5, start()).unwrap();
        scheduler.bury(&repo, "a").unwrap();

        assert!(!scheduler.roll_day(&repo, start() + Duration::hours(1)).unwrap());
        assert!(scheduler.roll_day(&repo, start() + Duration::days(1)).unwrap());
        assert!(!repo.get_card("a").unwrap().unwrap().buried);
        assert_eq!(scheduler.day_state().new_today, 0);
    }

    #[test]
    fn day_state_survives_restore() {
        let (repo, mut scheduler) = setup();
        scheduler.roll_day(&repo, start()).unwrap();

        let mut reopened = Scheduler::new(&EngineConfig::default());
        reopened.restore(&repo).unwrap();
        assert_eq!(reopened.day_state(), scheduler.day_state());
        assert!(!reopened.roll_day(&repo, start()).unwrap());
    }

    #[test]
    fn retention_must_be_a_probability() {
        let (repo, mut scheduler) = setup();
        assert!(matches!(
            scheduler.set_retention(&repo, "proj", 1.0),
            Err(EngineError::InvalidInput(_))
        ));
        scheduler.set_retention(&repo, "proj", 0.8).unwrap();
        assert_eq!(scheduler.retention(&repo, "proj").unwrap(), 0.8);
        assert_eq!(scheduler.retention(&repo, "other").unwrap(), 0.9);
    }

    #[test]
    fn preview_covers_all_ratings_without_writing() {
        let (repo, mut scheduler) = setup();
        repo.ensure_card("proj", &card("x"), start()).unwrap();

        let previews = scheduler.preview(&repo, "x", start()).unwrap();
        let ratings: Vec<Rating> = previews.iter().map(|p| p.rating).collect();
        assert_eq!(ratings, Rating::ALL.to_vec());
        assert_eq!(previews[0].label, "1m");
        assert_eq!(repo.get_card("x").unwrap().unwrap().state, CardState::New);

        assert!(matches!(
            scheduler.preview(&repo, "ghost", start()),
            Err(EngineError::CardNotFound(_))
        ));
    }
}
