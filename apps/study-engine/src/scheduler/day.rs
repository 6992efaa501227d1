//! Study-day boundaries and the day-scoped New-card quota.

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// The study day containing `now`.
///
/// Before `daily_reset_hour` (UTC) the previous calendar day is still
/// current, so a late session counts toward the day it started in.
pub fn study_day(now: DateTime<Utc>, daily_reset_hour: u32) -> NaiveDate {
    (now - Duration::hours(i64::from(daily_reset_hour))).date_naive()
}

/// Last seen study day plus the New cards introduced during it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayState {
    pub last_seen: Option<NaiveDate>,
    pub new_today: u32,
}

impl DayState {
    /// Move to `today`. Returns true when the day changed and the counter
    /// was reset; the very first observation also counts as a change.
    pub fn roll(&mut self, today: NaiveDate) -> bool {
        if self.last_seen == Some(today) {
            return false;
        }
        self.last_seen = Some(today);
        self.new_today = 0;
        true
    }

    pub fn under_cap(&self, cap: u32) -> bool {
        self.new_today < cap
    }

    pub fn record_new(&mut self) {
        self.new_today = self.new_today.saturating_add(1);
    }

    /// `YYYY-MM-DD:count`, the form kept in engine metadata.
    pub fn encode(&self) -> Option<String> {
        self.last_seen
            .map(|day| format!("{}:{}", day.format("%Y-%m-%d"), self.new_today))
    }

    pub fn decode(raw: &str) -> Option<Self> {
        let (day, count) = raw.split_once(':')?;
        Some(Self {
            last_seen: Some(NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()?),
            new_today: count.parse().ok()?,
        })
    }
}
