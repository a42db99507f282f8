//! Database module
//!
//! This module provides the storage side of the harness:
//!
//! - **core**: SQLite session wrapper and schema definitions
//! - **store**: the shared [`Store`] handle (autocommit path)
//! - **transaction**: [`TransactionContext`], one dedicated session per open transaction
//!
//! # Architecture
//!
//! ```text
//! database/
//! ├── core/           # Foundation
//! │   ├── connection  # SQLite DatabaseConn wrapper + session pragmas
//! │   └── schema      # row table and the two statements
//! │
//! ├── store           # Store: shared autocommit session, begin()
//! └── transaction     # TransactionContext: Open -> Committed | RolledBack
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use txprobe::database::{Executor, SessionSettings, Store, TxMode};
//!
//! let store = Store::bootstrap("./db.sqlite3", SessionSettings::default())?;
//! store.insert_row("name")?;
//!
//! let mut tx = store.begin(TxMode::Immediate)?;
//! let rows = tx.read_top(10)?;
//! tx.insert_row("name")?;
//! tx.commit()?;
//! ```

pub mod core;
pub mod store;
pub mod transaction;

pub use self::core::{DatabaseConn, SchemaDefinitions, SchemaManager, SessionSettings};
pub use store::{remove_database_files, Executor, Row, Store};
pub use transaction::{TransactionContext, TxMode, TxState};

use rusqlite::ErrorCode;

/// Whether an error was caused by SQLite lock contention
///
/// Covers `SQLITE_BUSY` (including busy-snapshot on a deferred upgrade) and
/// `SQLITE_LOCKED`, anywhere in the error's cause chain.
pub fn is_busy(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<rusqlite::Error>(),
            Some(rusqlite::Error::SqliteFailure(e, _))
                if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_is_busy_sees_through_context() {
        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        let err = Err::<(), _>(busy).context("Failed to insert row").unwrap_err();
        assert!(is_busy(&err));
    }

    #[test]
    fn test_is_busy_rejects_other_errors() {
        let constraint = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
            None,
        );
        assert!(!is_busy(&anyhow::Error::new(constraint)));
        assert!(!is_busy(&anyhow::anyhow!("plain failure")));
    }
}
