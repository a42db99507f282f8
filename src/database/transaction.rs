//! Transaction contexts
//!
//! A [`TransactionContext`] is an explicit state machine over one dedicated
//! SQLite session: `Open -> Committed | RolledBack`. SQLite transactions are
//! per-connection, so every context owns its own session and never shares it
//! with another scenario run.
//!
//! Lock acquisition follows SQLite's rules:
//!
//! - [`TxMode::Deferred`] (`BEGIN DEFERRED`) takes nothing at `begin`. The first
//!   read pins a WAL snapshot, the first write takes the writer lock.
//! - [`TxMode::Immediate`] (`BEGIN IMMEDIATE`) takes the writer lock at
//!   `begin`. WAL readers on other sessions keep running.
//!
//! Dropping a context that is still open rolls it back.

use anyhow::{anyhow, Context, Result};
use std::fmt;
use tracing::{debug, warn};

use crate::database::core::DatabaseConn;
use crate::database::store::{insert_row, select_top, Executor, Row};

/// Lock acquisition mode of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxMode {
    Deferred,
    Immediate,
}

impl TxMode {
    fn begin_sql(self) -> &'static str {
        match self {
            TxMode::Deferred => "BEGIN DEFERRED",
            TxMode::Immediate => "BEGIN IMMEDIATE",
        }
    }
}

impl fmt::Display for TxMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxMode::Deferred => write!(f, "deferred"),
            TxMode::Immediate => write!(f, "immediate"),
        }
    }
}

/// Lifecycle state of a transaction context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Open,
    Committed,
    RolledBack,
}

/// An open transaction on a dedicated session
#[must_use = "if unused, the transaction is immediately rolled back"]
pub struct TransactionContext {
    session: DatabaseConn,
    mode: TxMode,
    state: TxState,
}

impl TransactionContext {
    /// Issue `BEGIN` on `session` and take ownership of it
    pub(crate) fn begin(session: DatabaseConn, mode: TxMode) -> Result<Self> {
        session
            .conn
            .execute_batch(mode.begin_sql())
            .with_context(|| format!("Failed to begin {} transaction", mode))?;
        debug!("Began {} transaction", mode);

        Ok(Self {
            session,
            mode,
            state: TxState::Open,
        })
    }

    pub fn mode(&self) -> TxMode {
        self.mode
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == TxState::Open
    }

    /// Commit the transaction
    ///
    /// On failure the context stays open, so a later `rollback()` or the drop
    /// still brings it to a terminal state.
    pub fn commit(&mut self) -> Result<()> {
        self.ensure_open("commit")?;
        self.session
            .conn
            .execute_batch("COMMIT")
            .with_context(|| format!("Failed to commit {} transaction", self.mode))?;
        self.state = TxState::Committed;
        debug!("Committed {} transaction", self.mode);
        Ok(())
    }

    /// Roll back the transaction
    ///
    /// A no-op once the context is committed or rolled back.
    pub fn rollback(&mut self) -> Result<()> {
        if self.state != TxState::Open {
            return Ok(());
        }

        // SQLite ends the transaction itself on some errors (e.g. SQLITE_FULL)
        if self.session.conn.is_autocommit() {
            self.state = TxState::RolledBack;
            debug!("{} transaction already ended by SQLite", self.mode);
            return Ok(());
        }

        self.session
            .conn
            .execute_batch("ROLLBACK")
            .with_context(|| format!("Failed to roll back {} transaction", self.mode))?;
        self.state = TxState::RolledBack;
        debug!("Rolled back {} transaction", self.mode);
        Ok(())
    }

    fn ensure_open(&self, action: &str) -> Result<()> {
        match self.state {
            TxState::Open => Ok(()),
            state => Err(anyhow!(
                "Cannot {} a {} transaction in state {:?}",
                action,
                self.mode,
                state
            )),
        }
    }
}

impl Executor for TransactionContext {
    fn read_top(&self, limit: u32) -> Result<Vec<Row>> {
        self.ensure_open("read in")?;
        select_top(&self.session.conn, limit)
    }

    fn insert_row(&self, value: &str) -> Result<i64> {
        self.ensure_open("write in")?;
        insert_row(&self.session.conn, value)
    }
}

impl Drop for TransactionContext {
    fn drop(&mut self) {
        if self.state == TxState::Open {
            debug!("Dropping open {} transaction (rolling back)", self.mode);
            if let Err(e) = self.rollback() {
                warn!("Rollback on drop failed: {:#}", e);
            }
        }
    }
}
