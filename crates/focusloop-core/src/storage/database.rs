//! SQLite-based persistence.
//!
//! Provides durable storage for:
//! - The serialized session state (kv table, survives process restarts)
//! - The append-only work progress log
//! - The idempotent per-day completion marker
//! - Aggregated statistics over the progress log

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{CoreError, StoreError};
use crate::gateway::ProgressLog;
use crate::timer::SessionState;

/// kv key under which the resumable session state is persisted.
const SESSION_STATE_KEY: &str = "session_state";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Stats {
    pub total_stretches: u64,
    pub total_work_secs: u64,
    pub today_stretches: u64,
    pub today_work_secs: u64,
    /// Whether today's first-completed-work-session marker is set.
    pub today_complete: bool,
}

/// SQLite database at `~/.config/focusloop/focusloop.db`.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at the default data directory.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StoreError> {
        let path = data_dir()?.join("focusloop.db");
        Self::open_at(&path)
    }

    /// Open the database at an explicit path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS work_log (
                id      INTEGER PRIMARY KEY AUTOINCREMENT,
                seconds INTEGER NOT NULL,
                at      TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS daily_flags (
                day                TEXT PRIMARY KEY,
                first_completed_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_work_log_at ON work_log(at);",
        )?;
        Ok(())
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Load the persisted session state, if any.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read or the payload does not
    /// parse.
    pub fn load_session_state(&self) -> Result<Option<SessionState>, CoreError> {
        match self.kv_get(SESSION_STATE_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Persist the resumable session state.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn save_session_state(&self, state: &SessionState) -> Result<(), CoreError> {
        let json = serde_json::to_string(state)?;
        self.kv_set(SESSION_STATE_KEY, &json)?;
        Ok(())
    }

    pub fn stats_today(&self) -> Result<Stats, StoreError> {
        self.stats_at(Utc::now())
    }

    /// Statistics with "today" evaluated against `now` (tests pin the day).
    pub fn stats_at(&self, now: DateTime<Utc>) -> Result<Stats, StoreError> {
        let midnight = format!("{}T00:00:00+00:00", now.format("%Y-%m-%d"));

        let mut stats = Stats::default();
        let row = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(seconds), 0) FROM work_log",
            [],
            |row| Ok((row.get::<_, u64>(0)?, row.get::<_, u64>(1)?)),
        )?;
        stats.total_stretches = row.0;
        stats.total_work_secs = row.1;

        let row = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(seconds), 0) FROM work_log WHERE at >= ?1",
            params![midnight],
            |row| Ok((row.get::<_, u64>(0)?, row.get::<_, u64>(1)?)),
        )?;
        stats.today_stretches = row.0;
        stats.today_work_secs = row.1;

        stats.today_complete = self.is_day_complete(now)?;
        Ok(stats)
    }

    /// Whether `at`'s calendar day carries the completed-work marker.
    pub fn is_day_complete(&self, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let day = at.format("%Y-%m-%d").to_string();
        let mut stmt = self
            .conn
            .prepare("SELECT 1 FROM daily_flags WHERE day = ?1")?;
        let found = stmt.query_row(params![day], |_| Ok(()));
        match found {
            Ok(()) => Ok(true),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

impl ProgressLog for Database {
    fn append_work(&self, seconds: u32, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO work_log (seconds, at) VALUES (?1, ?2)",
            params![seconds, at.to_rfc3339()],
        )?;
        Ok(())
    }

    fn mark_today_complete(&self, at: DateTime<Utc>) -> Result<(), StoreError> {
        let day = at.format("%Y-%m-%d").to_string();
        // INSERT OR IGNORE keeps the first completion timestamp of the day.
        self.conn.execute(
            "INSERT OR IGNORE INTO daily_flags (day, first_completed_at) VALUES (?1, ?2)",
            params![day, at.to_rfc3339()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("cursor").unwrap().is_none());
        db.kv_set("cursor", "a").unwrap();
        assert_eq!(db.kv_get("cursor").unwrap().unwrap(), "a");
        db.kv_set("cursor", "b").unwrap();
        assert_eq!(db.kv_get("cursor").unwrap().unwrap(), "b");
    }

    #[test]
    fn session_state_roundtrip() {
        let db = Database::open_memory().unwrap();
        assert!(db.load_session_state().unwrap().is_none());

        let config = crate::storage::Config::default();
        let mut state = SessionState::initial(&config);
        state.remaining_secs = 777;
        state.cycle_count = 3;
        db.save_session_state(&state).unwrap();

        let loaded = db.load_session_state().unwrap().unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn append_and_aggregate() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();
        db.append_work(300, now).unwrap();
        db.append_work(120, now).unwrap();
        let stats = db.stats_at(now).unwrap();
        assert_eq!(stats.total_stretches, 2);
        assert_eq!(stats.total_work_secs, 420);
        assert_eq!(stats.today_stretches, 2);
        assert_eq!(stats.today_work_secs, 420);
    }

    #[test]
    fn yesterday_not_counted_today() {
        let db = Database::open_memory().unwrap();
        let yesterday = Utc.with_ymd_and_hms(2026, 8, 5, 12, 0, 0).unwrap();
        let today = Utc.with_ymd_and_hms(2026, 8, 6, 9, 0, 0).unwrap();
        db.append_work(600, yesterday).unwrap();
        db.append_work(60, today).unwrap();
        let stats = db.stats_at(today).unwrap();
        assert_eq!(stats.total_work_secs, 660);
        assert_eq!(stats.today_work_secs, 60);
        assert_eq!(stats.today_stretches, 1);
    }

    #[test]
    fn daily_marker_is_idempotent() {
        let db = Database::open_memory().unwrap();
        let morning = Utc.with_ymd_and_hms(2026, 8, 6, 9, 0, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2026, 8, 6, 21, 0, 0).unwrap();
        assert!(!db.is_day_complete(morning).unwrap());

        db.mark_today_complete(morning).unwrap();
        db.mark_today_complete(evening).unwrap();
        assert!(db.is_day_complete(evening).unwrap());

        // First completion timestamp survives the second mark.
        let kept: String = db
            .conn
            .query_row(
                "SELECT first_completed_at FROM daily_flags WHERE day = '2026-08-06'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(kept, morning.to_rfc3339());
    }
}
