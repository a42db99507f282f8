//! The shared storage handle
//!
//! [`Store`] owns the one autocommit session on the probe database and opens
//! dedicated sessions for transaction contexts. Both paths run the same two
//! statements through the [`Executor`] trait.

use anyhow::{anyhow, Context, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::database::core::{DatabaseConn, SchemaDefinitions, SchemaManager, SessionSettings};
use crate::database::transaction::{TransactionContext, TxMode};

/// A persisted row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: i64,
    pub name: String,
}

/// Something that can run the harness's two statements
///
/// Implemented by [`Store`] (autocommit on the shared session) and by
/// [`TransactionContext`] (inside an open transaction).
pub trait Executor {
    /// Up to `limit` rows in insertion order
    fn read_top(&self, limit: u32) -> Result<Vec<Row>>;

    /// Insert one row and return its assigned identity
    fn insert_row(&self, value: &str) -> Result<i64>;
}

pub(crate) fn select_top(conn: &Connection, limit: u32) -> Result<Vec<Row>> {
    let mut stmt = conn
        .prepare_cached(SchemaDefinitions::SELECT_TOP)
        .context("Failed to prepare select")?;

    let rows = stmt
        .query_map([limit], |row| {
            Ok(Row {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })
        .context("Failed to query rows")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to read row")?;

    Ok(rows)
}

pub(crate) fn insert_row(conn: &Connection, value: &str) -> Result<i64> {
    let mut stmt = conn
        .prepare_cached(SchemaDefinitions::INSERT_ROW)
        .context("Failed to prepare insert")?;
    stmt.insert([value]).context("Failed to insert row")
}

/// Shared handle on the probe database
pub struct Store {
    path: PathBuf,
    settings: SessionSettings,
    session: Mutex<DatabaseConn>,
}

impl Store {
    /// Recreate the database file from scratch and open it
    ///
    /// Removes the file and its `-wal`/`-shm` siblings, then behaves like
    /// [`Store::open`].
    pub fn bootstrap(path: impl AsRef<Path>, settings: SessionSettings) -> Result<Self> {
        let path = path.as_ref();
        remove_database_files(path)?;
        Self::open(path, settings)
    }

    /// Open the database file, create the row table if absent and enable WAL
    pub fn open(path: impl AsRef<Path>, settings: SessionSettings) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let session = DatabaseConn::open(&path, &settings)?;

        SchemaManager::new(&session.conn).initialize()?;
        session.enable_wal()?;
        info!(
            "Opened probe database at {} (busy timeout {:?})",
            path.display(),
            settings.busy_timeout
        );

        Ok(Self {
            path,
            settings,
            session: Mutex::new(session),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a transaction context on a fresh session
    pub fn begin(&self, mode: TxMode) -> Result<TransactionContext> {
        let session = DatabaseConn::open(&self.path, &self.settings)?;
        TransactionContext::begin(session, mode)
    }

    /// Number of rows currently visible to the autocommit session
    pub fn count(&self) -> Result<u64> {
        self.session()?
            .table_count(SchemaDefinitions::ROW_TABLE_NAME)
    }

    fn session(&self) -> Result<MutexGuard<'_, DatabaseConn>> {
        self.session
            .lock()
            .map_err(|_| anyhow!("Store session lock poisoned"))
    }
}

impl Executor for Store {
    fn read_top(&self, limit: u32) -> Result<Vec<Row>> {
        select_top(&self.session()?.conn, limit)
    }

    fn insert_row(&self, value: &str) -> Result<i64> {
        insert_row(&self.session()?.conn, value)
    }
}

/// Remove a database file together with its WAL and shared-memory files
pub fn remove_database_files(path: &Path) -> Result<()> {
    for suffix in ["", "-wal", "-shm"] {
        let mut target = path.as_os_str().to_owned();
        target.push(suffix);
        let target = PathBuf::from(target);

        match std::fs::remove_file(&target) {
            Ok(()) => info!("Removed {}", target.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to remove {}", target.display()))
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::bootstrap(dir.path().join("store.sqlite3"), SessionSettings::default())
            .unwrap();
        (dir, store)
    }

    #[test]
    fn test_bootstrap_creates_empty_wal_database() {
        let (_dir, store) = create_test_store();

        assert_eq!(store.count().unwrap(), 0);
        let mode = store.session().unwrap().journal_mode().unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[test]
    fn test_bootstrap_discards_previous_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reset.sqlite3");

        let store = Store::bootstrap(&path, SessionSettings::default()).unwrap();
        store.insert_row("name").unwrap();
        drop(store);

        let reopened = Store::open(&path, SessionSettings::default()).unwrap();
        assert_eq!(reopened.count().unwrap(), 1);
        drop(reopened);

        let reset = Store::bootstrap(&path, SessionSettings::default()).unwrap();
        assert_eq!(reset.count().unwrap(), 0);
    }

    #[test]
    fn test_insert_assigns_increasing_ids() {
        let (_dir, store) = create_test_store();
        let first = store.insert_row("a").unwrap();
        let second = store.insert_row("b").unwrap();
        assert!(second > first);
    }

    #[test]
    fn test_read_top_is_bounded_and_ordered() {
        let (_dir, store) = create_test_store();
        store.insert_row("name").unwrap();

        let rows = store.read_top(10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "name");

        for i in 0..9 {
            store.insert_row(&format!("row-{}", i)).unwrap();
        }
        let rows = store.read_top(10).unwrap();
        assert_eq!(rows.len(), 10);
        assert!(rows.windows(2).all(|w| w[0].id < w[1].id));

        store.insert_row("overflow").unwrap();
        assert_eq!(store.count().unwrap(), 11);
        let rows = store.read_top(10).unwrap();
        assert_eq!(rows.len(), 10);
        assert!(rows.iter().all(|r| r.name != "overflow"));
    }

    #[test]
    fn test_read_is_idempotent() {
        let (_dir, store) = create_test_store();
        for _ in 0..3 {
            store.insert_row("name").unwrap();
        }
        assert_eq!(store.read_top(10).unwrap(), store.read_top(10).unwrap());
    }

    #[test]
    fn test_remove_database_files_ignores_missing() {
        let dir = tempfile::tempdir().unwrap();
        remove_database_files(&dir.path().join("absent.sqlite3")).unwrap();
    }

    #[test]
    fn test_open_unwritable_location_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("db.sqlite3");
        assert!(Store::bootstrap(path, SessionSettings::default()).is_err());
    }
}
