//! SQLite schema definitions and versioned migrations.
//!
//! Each migration runs at most once. The applied version is mirrored to
//! `PRAGMA user_version`, and all pending migrations commit together.

use super::error::DbError;
use rusqlite::Connection;

type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    sql: &'static str,
}

/// Card store, review log and per-section scores.
const V1_CORE: &str = r#"
CREATE TABLE IF NOT EXISTS cards (
    card_id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    section_id TEXT NOT NULL,
    card_type TEXT NOT NULL CHECK (card_type IN ('mcq', 'passage', 'flashcard')),
    state INTEGER NOT NULL DEFAULT 0,
    due TEXT NOT NULL,
    stability REAL NOT NULL DEFAULT 0,
    difficulty REAL NOT NULL DEFAULT 0,
    elapsed_days INTEGER NOT NULL DEFAULT 0,
    scheduled_days INTEGER NOT NULL DEFAULT 0,
    reps INTEGER NOT NULL DEFAULT 0,
    lapses INTEGER NOT NULL DEFAULT 0,
    last_review TEXT,
    suspended INTEGER NOT NULL DEFAULT 0,
    buried INTEGER NOT NULL DEFAULT 0,
    leech INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS review_log (
    id TEXT PRIMARY KEY,
    card_id TEXT NOT NULL,
    project_id TEXT NOT NULL,
    section_id TEXT NOT NULL,
    rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 4),
    review_time TEXT NOT NULL,
    elapsed_ms INTEGER NOT NULL DEFAULT 0,
    new_state INTEGER NOT NULL,
    new_stability REAL NOT NULL,
    new_difficulty REAL NOT NULL,
    scheduled_days INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS scores (
    project_id TEXT NOT NULL,
    section_id TEXT NOT NULL,
    correct INTEGER NOT NULL DEFAULT 0,
    attempted INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (project_id, section_id),
    CHECK (correct <= attempted)
);

CREATE INDEX IF NOT EXISTS idx_cards_due ON cards(due);
CREATE INDEX IF NOT EXISTS idx_cards_section ON cards(project_id, section_id);
CREATE INDEX IF NOT EXISTS idx_review_log_card ON review_log(card_id);
CREATE INDEX IF NOT EXISTS idx_review_log_project ON review_log(project_id, review_time);
"#;

/// Undo slot, activity window, per-project model parameters, engine metadata.
const V2_SESSION: &str = r#"
CREATE TABLE IF NOT EXISTS undo_snapshot (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    card_id TEXT NOT NULL,
    prev_card TEXT NOT NULL,
    review_log_id TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS activity (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    section_id TEXT,
    rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 4),
    correct INTEGER NOT NULL,
    timestamp TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS model_params (
    project_id TEXT PRIMARY KEY,
    retention REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS engine_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_activity_project ON activity(project_id, timestamp);
"#;

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        sql: V1_CORE,
    },
    Migration {
        version: 2,
        sql: V2_SESSION,
    },
];

/// Latest schema version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Current `PRAGMA user_version` of the connection.
pub fn current_version(conn: &Connection) -> Result<u32> {
    let version = conn.query_row("PRAGMA user_version", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

/// Apply every pending migration in one transaction.
///
/// Returns the number of migrations applied.
pub fn apply_migrations(conn: &mut Connection) -> Result<usize> {
    let current = current_version(conn)?;
    let latest = latest_version();

    if current > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: latest,
        });
    }
    if current == latest {
        return Ok(0);
    }

    let tx = conn.transaction()?;
    let mut applied = 0;
    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        tx.execute_batch(migration.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {}", migration.version))?;
        tracing::info!(version = migration.version, "applied schema migration");
        applied += 1;
    }
    tx.commit()?;

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            [name],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn fresh_database_gets_every_table() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(apply_migrations(&mut conn).unwrap(), 2);
        assert_eq!(current_version(&conn).unwrap(), latest_version());
        for table in ["cards", "review_log", "scores", "undo_snapshot", "activity", "model_params", "engine_meta"] {
            assert!(table_exists(&conn, table), "missing table {table}");
        }
    }

    #[test]
    fn applying_twice_is_a_noop() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();
        assert_eq!(apply_migrations(&mut conn).unwrap(), 0);
    }

    #[test]
    fn upgrades_from_version_one() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(V1_CORE).unwrap();
        conn.execute_batch("PRAGMA user_version = 1").unwrap();

        assert_eq!(apply_migrations(&mut conn).unwrap(), 1);
        assert!(table_exists(&conn, "undo_snapshot"));
    }

    #[test]
    fn newer_schema_is_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA user_version = 99").unwrap();

        match apply_migrations(&mut conn) {
            Err(DbError::UnsupportedSchemaVersion { db_version, latest_supported }) => {
                assert_eq!(db_version, 99);
                assert_eq!(latest_supported, latest_version());
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
