//! Aggregate counters: due counts, section scores and the activity window.
//!
//! Nothing here is cached. Every read goes back to the card store or the
//! activity table, so the numbers cannot drift from the review history.

use crate::db::{
    ActivityRepository, CardRepository, CardScope, ScoreRepository, SqliteRepository,
    UndoRepository,
};
use crate::error::Result;
use chrono::{DateTime, Utc};
use srs_core::{ActivityEvent, DueCounts, Rating, SectionScore};
use tracing::{debug, info};
use uuid::Uuid;

pub fn count_due(repo: &SqliteRepository, scope: &CardScope<'_>, now: DateTime<Utc>) -> Result<DueCounts> {
    Ok(repo.count_due(scope, now)?)
}

/// Count one answer: `attempted` always, `correct` when the answer was right.
pub fn update_score(
    repo: &SqliteRepository,
    project_id: &str,
    section_id: &str,
    correct: bool,
) -> Result<SectionScore> {
    let score = repo.record_score(project_id, section_id, correct)?;
    debug!(
        project_id,
        section_id,
        correct = score.correct,
        attempted = score.attempted,
        "score updated"
    );
    Ok(score)
}

pub fn scores(repo: &SqliteRepository, project_id: &str) -> Result<Vec<SectionScore>> {
    Ok(repo.scores(project_id)?)
}

/// Delete every card of a section and zero its score.
///
/// A pending undo for one of those cards is dropped as well, so undo cannot
/// bring a deleted card back.
pub fn reset_section(repo: &SqliteRepository, project_id: &str, section_id: &str) -> Result<usize> {
    let deleted = repo.transaction(|tx| {
        if let Some(snapshot) = tx.load_undo()? {
            if snapshot.card.project_id == project_id && snapshot.card.section_id == section_id {
                tx.clear_undo()?;
            }
        }
        let deleted = tx.delete_section(project_id, section_id)?;
        tx.reset_score(project_id, section_id)?;
        Ok(deleted)
    })?;

    info!(project_id, section_id, deleted, "section reset");
    Ok(deleted)
}

/// Record a rating in the activity window and evict beyond `cap`.
pub fn add_activity(
    repo: &SqliteRepository,
    project_id: &str,
    section_id: Option<&str>,
    rating: Rating,
    cap: usize,
    now: DateTime<Utc>,
) -> Result<ActivityEvent> {
    let event = ActivityEvent {
        id: Uuid::now_v7().to_string(),
        project_id: project_id.to_string(),
        section_id: section_id.map(str::to_string),
        rating,
        correct: rating.is_correct(),
        timestamp: now,
    };

    let evicted = repo.transaction(|tx| {
        tx.append_activity(&event)?;
        tx.trim_activity(project_id, cap)
    })?;
    if evicted > 0 {
        debug!(project_id, evicted, "activity window trimmed");
    }
    Ok(event)
}

pub fn activity(repo: &SqliteRepository, project_id: &str, limit: usize) -> Result<Vec<ActivityEvent>> {
    Ok(repo.activity(project_id, limit)?)
}

pub fn clear_activity(repo: &SqliteRepository, project_id: &str) -> Result<usize> {
    let removed = repo.clear_activity(project_id)?;
    info!(project_id, removed, "activity cleared");
    Ok(removed)
}

/// Trend score over the retained window, optionally for one section.
pub fn activity_score(
    repo: &SqliteRepository,
    project_id: &str,
    section_id: Option<&str>,
    cap: usize,
    now: DateTime<Utc>,
) -> Result<f64> {
    let events = repo.activity(project_id, cap)?;
    Ok(srs_core::activity_score(&events, section_id, now))
}
