//! SQLite-based session history and key-value storage.
//!
//! Provides persistent storage for:
//! - Finished sessions (natural end or stopped early)
//! - Session statistics (daily and all-time)
//! - Key-value store used for profile settings

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::data_dir;
use super::profiles::Profile;
use crate::error::{CoreError, DatabaseError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    pub profile: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub prompts_acknowledged: u32,
    pub completed: bool,
}

/// Fields of a session about to be recorded.
#[derive(Debug, Clone)]
pub struct NewSessionRecord {
    pub profile: Profile,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub prompts_acknowledged: u32,
    pub completed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub total_sessions: u64,
    pub completed_sessions: u64,
    pub total_prompts: u64,
    pub total_minutes: u64,
    pub today_sessions: u64,
    pub today_prompts: u64,
}

/// SQLite database for session history and settings.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data_dir>/standcue.db`.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be created or the
    /// database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("standcue.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) the database file at `path`.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                profile     TEXT NOT NULL,
                started_at  TEXT NOT NULL,
                ended_at    TEXT NOT NULL,
                prompts     INTEGER NOT NULL DEFAULT 0,
                completed   INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_ended_at ON sessions(ended_at);",
        )?;
        Ok(())
    }

    /// Record a finished session.
    pub fn record_session(&self, record: &NewSessionRecord) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT INTO sessions (profile, started_at, ended_at, prompts, completed)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.profile.name(),
                record.started_at.to_rfc3339(),
                record.ended_at.to_rfc3339(),
                record.prompts_acknowledged,
                record.completed,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent sessions first.
    pub fn recent_sessions(&self, limit: usize) -> Result<Vec<SessionRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, profile, started_at, ended_at, prompts, completed
             FROM sessions
             ORDER BY ended_at DESC, id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, u32>(4)?,
                row.get::<_, bool>(5)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, profile, started, ended, prompts, completed) = row?;
            out.push(SessionRecord {
                id,
                profile,
                started_at: parse_ts(&started)?,
                ended_at: parse_ts(&ended)?,
                prompts_acknowledged: prompts,
                completed,
            });
        }
        Ok(out)
    }

    /// Totals across all sessions, plus today's (UTC) counts.
    pub fn stats(&self) -> Result<Stats, DatabaseError> {
        let mut stats = Stats::default();
        let today = Utc::now().format("%Y-%m-%d").to_string();
        let today_start = format!("{today}T00:00:00+00:00");

        let mut stmt = self
            .conn
            .prepare("SELECT started_at, ended_at, prompts, completed FROM sessions")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u64>(2)?,
                row.get::<_, bool>(3)?,
            ))
        })?;

        for row in rows {
            let (started, ended, prompts, completed) = row?;
            let started_at = parse_ts(&started)?;
            let ended_at = parse_ts(&ended)?;
            stats.total_sessions += 1;
            stats.total_prompts += prompts;
            stats.total_minutes += (ended_at - started_at).num_minutes().max(0) as u64;
            if completed {
                stats.completed_sessions += 1;
            }
            if ended >= today_start {
                stats.today_sessions += 1;
                stats.today_prompts += prompts;
            }
        }
        Ok(stats)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Remove a key; returns whether it existed.
    pub fn kv_delete(&self, key: &str) -> Result<bool, DatabaseError> {
        let n = self
            .conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(n > 0)
    }
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::QueryFailed(format!("bad timestamp '{s}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(minutes: i64, prompts: u32, completed: bool) -> NewSessionRecord {
        let ended_at = Utc::now();
        NewSessionRecord {
            profile: Profile::Training,
            started_at: ended_at - Duration::minutes(minutes),
            ended_at,
            prompts_acknowledged: prompts,
            completed,
        }
    }

    #[test]
    fn record_and_query() {
        let db = Database::open_memory().unwrap();
        db.record_session(&record(5, 4, true)).unwrap();
        db.record_session(&record(2, 1, false)).unwrap();

        let stats = db.stats().unwrap();
        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.completed_sessions, 1);
        assert_eq!(stats.total_prompts, 5);
        assert_eq!(stats.total_minutes, 7);
        assert_eq!(stats.today_sessions, 2);
    }

    #[test]
    fn recent_sessions_newest_first() {
        let db = Database::open_memory().unwrap();
        let first = db.record_session(&record(5, 4, true)).unwrap();
        let second = db.record_session(&record(1, 0, false)).unwrap();
        let recent = db.recent_sessions(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, second);
        assert_eq!(recent[1].id, first);
        assert_eq!(recent[0].profile, "training");
        assert_eq!(db.recent_sessions(1).unwrap().len(), 1);
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().as_deref(), Some("hello"));
        assert!(db.kv_delete("test").unwrap());
        assert!(!db.kv_delete("test").unwrap());
    }

    #[test]
    fn file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("standcue.db");
        {
            let db = Database::open_at(&path).unwrap();
            db.kv_set("profile.training", "{}").unwrap();
        }
        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.kv_get("profile.training").unwrap().as_deref(), Some("{}"));
    }
}
