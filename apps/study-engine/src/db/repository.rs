//! Repository pattern for database access.

use crate::db::error::DbError;
use crate::db::schema;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use srs_core::{
    ActivityEvent, Card, CardRef, CardState, CardType, DueCounts, Rating, ReviewLogEntry,
    SectionScore,
};
use std::path::Path;
use std::time::Duration;

type Result<T> = std::result::Result<T, DbError>;

const CARD_COLUMNS: &str = "card_id, project_id, section_id, card_type, state, due, stability, \
     difficulty, elapsed_days, scheduled_days, reps, lapses, last_review, suspended, buried, leech";

const REVIEW_COLUMNS: &str = "id, card_id, project_id, section_id, rating, review_time, elapsed_ms, \
     new_state, new_stability, new_difficulty, scheduled_days";

/// Selection filter over the card table.
///
/// Matches cards of one project whose section is in `section_ids`, that are
/// neither suspended nor buried, optionally of a single card type.
#[derive(Debug, Clone, Copy)]
pub struct CardScope<'a> {
    pub project_id: &'a str,
    pub section_ids: &'a [String],
    pub card_type: Option<CardType>,
}

impl<'a> CardScope<'a> {
    pub fn new(project_id: &'a str, section_ids: &'a [String]) -> Self {
        Self {
            project_id,
            section_ids,
            card_type: None,
        }
    }

    pub fn with_card_type(self, card_type: Option<CardType>) -> Self {
        Self { card_type, ..self }
    }

    /// No sections means no cards can match.
    pub fn is_empty(&self) -> bool {
        self.section_ids.is_empty()
    }

    /// WHERE predicate with positional placeholders, and its bound values.
    fn predicate(&self) -> (String, Vec<Value>) {
        let placeholders = vec!["?"; self.section_ids.len()].join(", ");
        let mut sql = format!(
            "project_id = ? AND section_id IN ({placeholders}) AND suspended = 0 AND buried = 0"
        );
        let mut values = Vec::with_capacity(self.section_ids.len() + 2);
        values.push(Value::Text(self.project_id.to_string()));
        values.extend(self.section_ids.iter().map(|id| Value::Text(id.clone())));
        if let Some(card_type) = self.card_type {
            sql.push_str(" AND card_type = ?");
            values.push(Value::Text(card_type.as_str().to_string()));
        }
        (sql, values)
    }
}

/// Pre-review copy of a card plus the review log entry it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndoSnapshot {
    pub card: Card,
    pub review_log_id: String,
}

/// Repository for card scheduling rows.
pub trait CardRepository {
    /// Insert a New card unless one exists. Returns true when inserted.
    fn ensure_card(&self, project_id: &str, card: &CardRef, now: DateTime<Utc>) -> Result<bool>;
    fn get_card(&self, card_id: &str) -> Result<Option<Card>>;
    fn save_card(&self, card: &Card) -> Result<()>;
    fn set_suspended(&self, card_id: &str, suspended: bool) -> Result<()>;
    fn set_buried(&self, card_id: &str, buried: bool) -> Result<()>;
    /// Clear `buried` for one project, or every card when `project_id` is None.
    fn unbury_all(&self, project_id: Option<&str>) -> Result<usize>;
    fn delete_section(&self, project_id: &str, section_id: &str) -> Result<usize>;
    /// Card in one of `states` with the earliest due date not after `now`.
    fn earliest_due(
        &self,
        scope: &CardScope<'_>,
        states: &[CardState],
        now: DateTime<Utc>,
    ) -> Result<Option<String>>;
    fn new_card_ids(&self, scope: &CardScope<'_>) -> Result<Vec<String>>;
    /// Eligible card with the lowest stability.
    fn weakest_card(&self, scope: &CardScope<'_>) -> Result<Option<String>>;
    fn count_due(&self, scope: &CardScope<'_>, now: DateTime<Utc>) -> Result<DueCounts>;
}

/// Repository for the append-only review log.
pub trait ReviewLogRepository {
    fn append_review(&self, entry: &ReviewLogEntry) -> Result<()>;
    /// Returns true when an entry was removed.
    fn delete_review(&self, id: &str) -> Result<bool>;
    fn review_log(&self, project_id: &str, limit: usize) -> Result<Vec<ReviewLogEntry>>;
    fn reviews_for_card(&self, card_id: &str) -> Result<Vec<ReviewLogEntry>>;
}

/// Repository for the single undo slot.
pub trait UndoRepository {
    fn save_undo(&self, snapshot: &UndoSnapshot) -> Result<()>;
    fn load_undo(&self) -> Result<Option<UndoSnapshot>>;
    fn clear_undo(&self) -> Result<()>;
}

/// Repository for per-section correct/attempted counters.
pub trait ScoreRepository {
    fn ensure_score(&self, project_id: &str, section_id: &str) -> Result<()>;
    fn record_score(&self, project_id: &str, section_id: &str, correct: bool) -> Result<SectionScore>;
    fn scores(&self, project_id: &str) -> Result<Vec<SectionScore>>;
    fn reset_score(&self, project_id: &str, section_id: &str) -> Result<()>;
}

/// Repository for the bounded activity window.
pub trait ActivityRepository {
    fn append_activity(&self, event: &ActivityEvent) -> Result<()>;
    /// Drop the oldest events beyond `cap`. Returns the number removed.
    fn trim_activity(&self, project_id: &str, cap: usize) -> Result<usize>;
    fn activity(&self, project_id: &str, limit: usize) -> Result<Vec<ActivityEvent>>;
    fn clear_activity(&self, project_id: &str) -> Result<usize>;
}

/// Repository for per-project memory model parameters.
pub trait ParamsRepository {
    fn retention(&self, project_id: &str) -> Result<Option<f64>>;
    fn set_retention(&self, project_id: &str, retention: f64) -> Result<()>;
}

/// Repository for engine key/value metadata.
pub trait MetaRepository {
    fn get_meta(&self, key: &str) -> Result<Option<String>>;
    fn set_meta(&self, key: &str, value: &str) -> Result<()>;
}

/// SQLite implementation of repositories.
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Open database at path, creating if necessary, and apply migrations.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::bootstrap(conn)
    }

    /// Open in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::bootstrap(conn)
    }

    fn bootstrap(mut conn: Connection) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        let applied = schema::apply_migrations(&mut conn)?;
        tracing::info!(
            applied,
            version = schema::latest_version(),
            "database ready"
        );
        Ok(Self { conn })
    }

    pub fn schema_version(&self) -> Result<u32> {
        schema::current_version(&self.conn)
    }

    /// Run `f` inside a transaction; any error rolls back every write it made.
    pub fn transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let tx = self.conn.unchecked_transaction()?;
        let value = f(self)?;
        tx.commit()?;
        Ok(value)
    }

    fn row_to_card(row: &Row) -> rusqlite::Result<Card> {
        Ok(Card {
            card_id: row.get(0)?,
            project_id: row.get(1)?,
            section_id: row.get(2)?,
            card_type: card_type_column(row, 3)?,
            state: state_column(row, 4)?,
            due: timestamp_column(row, 5)?,
            stability: row.get(6)?,
            difficulty: row.get(7)?,
            elapsed_days: row.get(8)?,
            scheduled_days: row.get(9)?,
            reps: row.get(10)?,
            lapses: row.get(11)?,
            last_review: optional_timestamp_column(row, 12)?,
            suspended: row.get(13)?,
            buried: row.get(14)?,
            leech: row.get(15)?,
        })
    }

    fn row_to_review(row: &Row) -> rusqlite::Result<ReviewLogEntry> {
        Ok(ReviewLogEntry {
            id: row.get(0)?,
            card_id: row.get(1)?,
            project_id: row.get(2)?,
            section_id: row.get(3)?,
            rating: rating_column(row, 4)?,
            review_time: timestamp_column(row, 5)?,
            elapsed_ms: u64::try_from(row.get::<_, i64>(6)?).unwrap_or(0),
            new_state: state_column(row, 7)?,
            new_stability: row.get(8)?,
            new_difficulty: row.get(9)?,
            scheduled_days: row.get(10)?,
        })
    }

    fn row_to_activity(row: &Row) -> rusqlite::Result<ActivityEvent> {
        Ok(ActivityEvent {
            id: row.get(0)?,
            project_id: row.get(1)?,
            section_id: row.get(2)?,
            rating: rating_column(row, 3)?,
            correct: row.get(4)?,
            timestamp: timestamp_column(row, 5)?,
        })
    }

    fn row_to_score(row: &Row) -> rusqlite::Result<SectionScore> {
        Ok(SectionScore {
            project_id: row.get(0)?,
            section_id: row.get(1)?,
            correct: row.get(2)?,
            attempted: row.get(3)?,
        })
    }
}

/// Fixed-width UTC timestamp; sorts lexicographically in time order.
pub(crate) fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn timestamp_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn optional_timestamp_column(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_error(idx, e))
    })
    .transpose()
}

fn state_column(row: &Row, idx: usize) -> rusqlite::Result<CardState> {
    CardState::from_value(row.get(idx)?).map_err(|e| conversion_error(idx, e))
}

fn rating_column(row: &Row, idx: usize) -> rusqlite::Result<Rating> {
    Rating::from_value(row.get(idx)?).map_err(|e| conversion_error(idx, e))
}

fn card_type_column(row: &Row, idx: usize) -> rusqlite::Result<CardType> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_error(idx, e))
}

impl CardRepository for SqliteRepository {
    fn ensure_card(&self, project_id: &str, card: &CardRef, now: DateTime<Utc>) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO cards (card_id, project_id, section_id, card_type, state, due)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)",
            params![
                card.card_id,
                project_id,
                card.section_id,
                card.card_type.as_str(),
                format_timestamp(&now),
            ],
        )?;
        Ok(inserted == 1)
    }

    fn get_card(&self, card_id: &str) -> Result<Option<Card>> {
        self.conn
            .query_row(
                &format!("SELECT {CARD_COLUMNS} FROM cards WHERE card_id = ?1"),
                params![card_id],
                Self::row_to_card,
            )
            .optional()
            .map_err(Into::into)
    }

    fn save_card(&self, card: &Card) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO cards ({CARD_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
                 ON CONFLICT(card_id) DO UPDATE SET
                    project_id = excluded.project_id,
                    section_id = excluded.section_id,
                    card_type = excluded.card_type,
                    state = excluded.state,
                    due = excluded.due,
                    stability = excluded.stability,
                    difficulty = excluded.difficulty,
                    elapsed_days = excluded.elapsed_days,
                    scheduled_days = excluded.scheduled_days,
                    reps = excluded.reps,
                    lapses = excluded.lapses,
                    last_review = excluded.last_review,
                    suspended = excluded.suspended,
                    buried = excluded.buried,
                    leech = excluded.leech"
            ),
            params![
                card.card_id,
                card.project_id,
                card.section_id,
                card.card_type.as_str(),
                card.state.to_value(),
                format_timestamp(&card.due),
                card.stability,
                card.difficulty,
                card.elapsed_days,
                card.scheduled_days,
                card.reps,
                card.lapses,
                card.last_review.as_ref().map(format_timestamp),
                card.suspended,
                card.buried,
                card.leech,
            ],
        )?;
        Ok(())
    }

    fn set_suspended(&self, card_id: &str, suspended: bool) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE cards SET suspended = ?1 WHERE card_id = ?2",
            params![suspended, card_id],
        )?;
        if updated == 0 {
            return Err(DbError::CardNotFound(card_id.to_string()));
        }
        Ok(())
    }

    fn set_buried(&self, card_id: &str, buried: bool) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE cards SET buried = ?1 WHERE card_id = ?2",
            params![buried, card_id],
        )?;
        if updated == 0 {
            return Err(DbError::CardNotFound(card_id.to_string()));
        }
        Ok(())
    }

    fn unbury_all(&self, project_id: Option<&str>) -> Result<usize> {
        let count = match project_id {
            Some(project) => self.conn.execute(
                "UPDATE cards SET buried = 0 WHERE buried = 1 AND project_id = ?1",
                params![project],
            )?,
            None => self
                .conn
                .execute("UPDATE cards SET buried = 0 WHERE buried = 1", [])?,
        };
        Ok(count)
    }

    fn delete_section(&self, project_id: &str, section_id: &str) -> Result<usize> {
        let count = self.conn.execute(
            "DELETE FROM cards WHERE project_id = ?1 AND section_id = ?2",
            params![project_id, section_id],
        )?;
        Ok(count)
    }

    fn earliest_due(
        &self,
        scope: &CardScope<'_>,
        states: &[CardState],
        now: DateTime<Utc>,
    ) -> Result<Option<String>> {
        if scope.is_empty() || states.is_empty() {
            return Ok(None);
        }
        let (predicate, mut values) = scope.predicate();
        let state_list = states
            .iter()
            .map(|state| state.to_value().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT card_id FROM cards
             WHERE {predicate} AND state IN ({state_list}) AND due <= ?
             ORDER BY due ASC, card_id ASC
             LIMIT 1"
        );
        values.push(Value::Text(format_timestamp(&now)));

        self.conn
            .query_row(&sql, params_from_iter(values), |row| row.get(0))
            .optional()
            .map_err(Into::into)
    }

    fn new_card_ids(&self, scope: &CardScope<'_>) -> Result<Vec<String>> {
        if scope.is_empty() {
            return Ok(Vec::new());
        }
        let (predicate, values) = scope.predicate();
        let sql = format!("SELECT card_id FROM cards WHERE {predicate} AND state = 0 ORDER BY card_id");

        let mut stmt = self.conn.prepare(&sql)?;
        let ids = stmt
            .query_map(params_from_iter(values), |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    fn weakest_card(&self, scope: &CardScope<'_>) -> Result<Option<String>> {
        if scope.is_empty() {
            return Ok(None);
        }
        let (predicate, values) = scope.predicate();
        let sql = format!(
            "SELECT card_id FROM cards WHERE {predicate}
             ORDER BY stability ASC, due ASC, card_id ASC
             LIMIT 1"
        );

        self.conn
            .query_row(&sql, params_from_iter(values), |row| row.get(0))
            .optional()
            .map_err(Into::into)
    }

    fn count_due(&self, scope: &CardScope<'_>, now: DateTime<Utc>) -> Result<DueCounts> {
        if scope.is_empty() {
            return Ok(DueCounts::default());
        }
        let (predicate, predicate_values) = scope.predicate();
        let sql = format!(
            "SELECT
                COALESCE(SUM(CASE WHEN state != 0 AND due <= ? THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN state = 0 THEN 1 ELSE 0 END), 0),
                COUNT(*)
             FROM cards WHERE {predicate}"
        );
        let mut values = vec![Value::Text(format_timestamp(&now))];
        values.extend(predicate_values);

        self.conn
            .query_row(&sql, params_from_iter(values), |row| {
                Ok(DueCounts {
                    due: row.get(0)?,
                    new_count: row.get(1)?,
                    total: row.get(2)?,
                })
            })
            .map_err(Into::into)
    }
}

impl ReviewLogRepository for SqliteRepository {
    fn append_review(&self, entry: &ReviewLogEntry) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO review_log ({REVIEW_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
            ),
            params![
                entry.id,
                entry.card_id,
                entry.project_id,
                entry.section_id,
                entry.rating.to_value(),
                format_timestamp(&entry.review_time),
                i64::try_from(entry.elapsed_ms).unwrap_or(i64::MAX),
                entry.new_state.to_value(),
                entry.new_stability,
                entry.new_difficulty,
                entry.scheduled_days,
            ],
        )?;
        Ok(())
    }

    fn delete_review(&self, id: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM review_log WHERE id = ?1", params![id])?;
        Ok(deleted == 1)
    }

    fn review_log(&self, project_id: &str, limit: usize) -> Result<Vec<ReviewLogEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REVIEW_COLUMNS} FROM review_log
             WHERE project_id = ?1
             ORDER BY review_time DESC, id DESC
             LIMIT ?2"
        ))?;
        let entries = stmt
            .query_map(params![project_id, limit], Self::row_to_review)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn reviews_for_card(&self, card_id: &str) -> Result<Vec<ReviewLogEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REVIEW_COLUMNS} FROM review_log
             WHERE card_id = ?1
             ORDER BY review_time ASC, id ASC"
        ))?;
        let entries = stmt
            .query_map(params![card_id], Self::row_to_review)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

impl UndoRepository for SqliteRepository {
    fn save_undo(&self, snapshot: &UndoSnapshot) -> Result<()> {
        let prev_card = serde_json::to_string(&snapshot.card)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO undo_snapshot (id, card_id, prev_card, review_log_id)
             VALUES (1, ?1, ?2, ?3)",
            params![snapshot.card.card_id, prev_card, snapshot.review_log_id],
        )?;
        Ok(())
    }

    fn load_undo(&self) -> Result<Option<UndoSnapshot>> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT prev_card, review_log_id FROM undo_snapshot WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((prev_card, review_log_id)) => Ok(Some(UndoSnapshot {
                card: serde_json::from_str(&prev_card)?,
                review_log_id,
            })),
            None => Ok(None),
        }
    }

    fn clear_undo(&self) -> Result<()> {
        self.conn.execute("DELETE FROM undo_snapshot", [])?;
        Ok(())
    }
}

impl ScoreRepository for SqliteRepository {
    fn ensure_score(&self, project_id: &str, section_id: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO scores (project_id, section_id, correct, attempted)
             VALUES (?1, ?2, 0, 0)",
            params![project_id, section_id],
        )?;
        Ok(())
    }

    fn record_score(&self, project_id: &str, section_id: &str, correct: bool) -> Result<SectionScore> {
        self.conn.execute(
            "INSERT INTO scores (project_id, section_id, correct, attempted)
             VALUES (?1, ?2, ?3, 1)
             ON CONFLICT(project_id, section_id) DO UPDATE SET
                correct = correct + excluded.correct,
                attempted = attempted + 1",
            params![project_id, section_id, u32::from(correct)],
        )?;

        self.conn
            .query_row(
                "SELECT project_id, section_id, correct, attempted FROM scores
                 WHERE project_id = ?1 AND section_id = ?2",
                params![project_id, section_id],
                Self::row_to_score,
            )
            .map_err(Into::into)
    }

    fn scores(&self, project_id: &str) -> Result<Vec<SectionScore>> {
        let mut stmt = self.conn.prepare(
            "SELECT project_id, section_id, correct, attempted FROM scores
             WHERE project_id = ?1
             ORDER BY section_id",
        )?;
        let scores = stmt
            .query_map(params![project_id], Self::row_to_score)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(scores)
    }

    fn reset_score(&self, project_id: &str, section_id: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE scores SET correct = 0, attempted = 0 WHERE project_id = ?1 AND section_id = ?2",
            params![project_id, section_id],
        )?;
        Ok(())
    }
}

impl ActivityRepository for SqliteRepository {
    fn append_activity(&self, event: &ActivityEvent) -> Result<()> {
        self.conn.execute(
            "INSERT INTO activity (id, project_id, section_id, rating, correct, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                event.id,
                event.project_id,
                event.section_id,
                event.rating.to_value(),
                event.correct,
                format_timestamp(&event.timestamp),
            ],
        )?;
        Ok(())
    }

    fn trim_activity(&self, project_id: &str, cap: usize) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM activity WHERE project_id = ?1",
            params![project_id],
            |row| row.get(0),
        )?;
        let count = usize::try_from(count).unwrap_or(0);
        if count <= cap {
            return Ok(0);
        }

        let removed = self.conn.execute(
            "DELETE FROM activity WHERE id IN (
                SELECT id FROM activity WHERE project_id = ?1
                ORDER BY timestamp ASC, id ASC
                LIMIT ?2
             )",
            params![project_id, count - cap],
        )?;
        Ok(removed)
    }

    fn activity(&self, project_id: &str, limit: usize) -> Result<Vec<ActivityEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, project_id, section_id, rating, correct, timestamp FROM activity
             WHERE project_id = ?1
             ORDER BY timestamp DESC, id DESC
             LIMIT ?2",
        )?;
        let events = stmt
            .query_map(params![project_id, limit], Self::row_to_activity)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(events)
    }

    fn clear_activity(&self, project_id: &str) -> Result<usize> {
        let removed = self.conn.execute(
            "DELETE FROM activity WHERE project_id = ?1",
            params![project_id],
        )?;
        Ok(removed)
    }
}

impl ParamsRepository for SqliteRepository {
    fn retention(&self, project_id: &str) -> Result<Option<f64>> {
        self.conn
            .query_row(
                "SELECT retention FROM model_params WHERE project_id = ?1",
                params![project_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    fn set_retention(&self, project_id: &str, retention: f64) -> Result<()> {
        self.conn.execute(
            "INSERT INTO model_params (project_id, retention) VALUES (?1, ?2)
             ON CONFLICT(project_id) DO UPDATE SET retention = excluded.retention",
            params![project_id, retention],
        )?;
        Ok(())
    }
}

impl MetaRepository for SqliteRepository {
    fn get_meta(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM engine_meta WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO engine_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }
}
