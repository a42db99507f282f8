//! Database connection management
//!
//! This module provides the session wrapper used by the store and by every
//! transaction context. Each `DatabaseConn` is one SQLite connection, i.e. one
//! locking participant from SQLite's point of view.

use anyhow::{anyhow, Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

/// Per-session settings applied whenever a connection is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// How long a statement waits on a held lock before failing with `SQLITE_BUSY`
    pub busy_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_millis(5000),
        }
    }
}

impl SessionSettings {
    pub fn with_busy_timeout(busy_timeout: Duration) -> Self {
        Self { busy_timeout }
    }
}

/// Core database connection wrapper
///
/// `DatabaseConn` is a thin wrapper around a file-backed SQLite connection
/// with the harness's session pragmas applied. Journal mode is a property of
/// the file, so it is switched once through [`DatabaseConn::enable_wal`]
/// rather than on every open.
pub struct DatabaseConn {
    pub conn: Connection,
}

impl DatabaseConn {
    /// Open a session on the database file at `path`, creating it if missing
    pub fn open(path: &Path, settings: &SessionSettings) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at '{}'", path.display()))?;

        let db = DatabaseConn { conn };
        db.configure(settings)?;
        Ok(db)
    }

    /// Configure the session
    fn configure(&self, settings: &SessionSettings) -> Result<()> {
        // Must come first: every later statement may contend for a lock
        self.conn
            .busy_timeout(settings.busy_timeout)
            .context("Failed to set busy timeout")?;

        // Under WAL, NORMAL only syncs at checkpoints
        self.conn
            .execute("PRAGMA synchronous=NORMAL", [])
            .context("Failed to set synchronous mode")?;

        Ok(())
    }

    /// Switch the database file to write-ahead-log journaling
    ///
    /// Returns an error if SQLite refuses the switch (it reports the journal
    /// mode actually in effect).
    pub fn enable_wal(&self) -> Result<()> {
        let mode: String = self
            .conn
            .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))
            .context("Failed to set journal mode")?;

        if !mode.eq_ignore_ascii_case("wal") {
            return Err(anyhow!("Journal mode stayed '{}' instead of 'wal'", mode));
        }
        Ok(())
    }

    /// Current journal mode of the database file
    pub fn journal_mode(&self) -> Result<String> {
        self.conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .context("Failed to read journal mode")
    }

    /// Get the row count for a table
    pub fn table_count(&self, table_name: &str) -> Result<u64> {
        let query = format!("SELECT COUNT(*) FROM {}", table_name);
        let count: u64 = self
            .conn
            .query_row(&query, [], |row| row.get(0))
            .context("Failed to get table count")?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, DatabaseConn) {
        let dir = tempfile::tempdir().unwrap();
        let db = DatabaseConn::open(&dir.path().join("conn.sqlite3"), &SessionSettings::default())
            .unwrap();
        (dir, db)
    }

    #[test]
    fn test_open_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.sqlite3");
        assert!(!path.exists());

        DatabaseConn::open(&path, &SessionSettings::default()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_open_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("db.sqlite3");
        assert!(DatabaseConn::open(&path, &SessionSettings::default()).is_err());
    }

    #[test]
    fn test_enable_wal() {
        let (_dir, db) = open_temp();
        assert_eq!(db.journal_mode().unwrap().to_lowercase(), "delete");

        db.enable_wal().unwrap();
        assert_eq!(db.journal_mode().unwrap().to_lowercase(), "wal");
    }

    #[test]
    fn test_busy_timeout_applied() {
        let dir = tempfile::tempdir().unwrap();
        let settings = SessionSettings::with_busy_timeout(Duration::from_millis(250));
        let db = DatabaseConn::open(&dir.path().join("busy.sqlite3"), &settings).unwrap();

        let timeout: i64 = db
            .conn
            .query_row("PRAGMA busy_timeout", [], |row| row.get(0))
            .unwrap();
        assert_eq!(timeout, 250);
    }

    #[test]
    fn test_table_count() {
        let (_dir, db) = open_temp();
        db.conn
            .execute_batch(
                "CREATE TABLE test_table (id INTEGER PRIMARY KEY);
                 INSERT INTO test_table (id) VALUES (1), (2), (3);",
            )
            .unwrap();

        assert_eq!(db.table_count("test_table").unwrap(), 3);
        assert!(db.table_count("nonexistent_table").is_err());
    }

    #[test]
    fn test_synchronous_normal_applied() {
        let (_dir, db) = open_temp();
        let synchronous: i64 = db
            .conn
            .query_row("PRAGMA synchronous", [], |row| row.get(0))
            .unwrap();
        // 1 = NORMAL
        assert_eq!(synchronous, 1);
    }
}
