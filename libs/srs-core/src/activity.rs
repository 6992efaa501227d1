//! Recency-weighted activity trend score.

use crate::types::{ActivityEvent, Rating};
use chrono::{DateTime, Duration, Utc};

/// Points earned by one event.
fn points(event: &ActivityEvent) -> f64 {
    if !event.correct {
        return -2.0;
    }
    match event.rating {
        Rating::Easy => 4.0,
        Rating::Good => 3.0,
        Rating::Hard => 1.0,
        Rating::Again => -2.0,
    }
}

/// Weight by age: full for the last day, fading to a fifth after a week.
fn weight(age: Duration) -> f64 {
    if age < Duration::days(1) {
        1.0
    } else if age < Duration::days(3) {
        0.7
    } else if age < Duration::days(7) {
        0.4
    } else {
        0.2
    }
}

/// Trend score over `events`, optionally restricted to one section.
///
/// Never negative.
pub fn activity_score(events: &[ActivityEvent], section_id: Option<&str>, now: DateTime<Utc>) -> f64 {
    let total: f64 = events
        .iter()
        .filter(|event| match section_id {
            Some(section) => event.section_id.as_deref() == Some(section),
            None => true,
        })
        .map(|event| points(event) * weight(now - event.timestamp))
        .sum();
    total.max(0.0)
}
