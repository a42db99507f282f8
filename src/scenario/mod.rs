//! Scenario programs
//!
//! Every scenario is data: an ordered list of [`Step`]s plus a [`Scope`] that
//! says whether the steps run autocommit, inside a transaction of a given
//! [`TxMode`], or not at all. The [`Sequencer`] drives one program against a
//! [`Store`] and yields an [`Output`].
//!
//! | Scenario | Steps | Scope |
//! |---|---|---|
//! | `read` | read | autocommit |
//! | `read_transaction` | read | deferred transaction |
//! | `write` | write | autocommit |
//! | `read_write` | read, write | autocommit |
//! | `write_read` | write, read | autocommit |
//! | `read_write_transaction` | read, write | deferred transaction |
//! | `write_read_transaction` | write, read | deferred transaction |
//! | `read_write_transaction_immediate` | read, write | immediate transaction |
//!
//! [`IMMEDIATE_PLACEHOLDER`] is the acknowledgment-only variant of the last
//! scenario; the dispatcher swaps it in when configured to.

pub mod dispatcher;

pub use dispatcher::{DispatchError, Dispatcher, ErrorKind};

use anyhow::{Context, Result};
use std::fmt;

use crate::database::{Executor, Row, Store, TxMode};

/// One statement of a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Bounded select of the oldest rows
    Read,
    /// Single-row insert
    Write,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Read => write!(f, "read"),
            Step::Write => write!(f, "write"),
        }
    }
}

/// Where the steps of a scenario run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Directly on the shared session, one implicit transaction per statement
    Autocommit,
    /// Inside one transaction: begin before the first step, commit after the last
    Transaction(TxMode),
    /// No store access at all; the run answers with an acknowledgment
    Acknowledge,
}

/// A named, immutable scenario program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scenario {
    pub name: &'static str,
    pub steps: &'static [Step],
    pub scope: Scope,
}

impl Scenario {
    pub const fn new(name: &'static str, steps: &'static [Step], scope: Scope) -> Self {
        Self { name, steps, scope }
    }

    /// Whether a successful run renders rows rather than an acknowledgment
    pub fn reads(&self) -> bool {
        self.scope != Scope::Acknowledge && self.steps.contains(&Step::Read)
    }

    /// Human-readable shape, e.g. `read, write in deferred transaction`
    pub fn describe(&self) -> String {
        let steps = self
            .steps
            .iter()
            .map(Step::to_string)
            .collect::<Vec<_>>()
            .join(", ");

        match self.scope {
            Scope::Autocommit => format!("{} (autocommit)", steps),
            Scope::Transaction(mode) => format!("{} in {} transaction", steps, mode),
            Scope::Acknowledge => "acknowledge only".to_string(),
        }
    }
}

pub const READ: Scenario = Scenario::new("read", &[Step::Read], Scope::Autocommit);

pub const READ_TRANSACTION: Scenario = Scenario::new(
    "read_transaction",
    &[Step::Read],
    Scope::Transaction(TxMode::Deferred),
);

pub const WRITE: Scenario = Scenario::new("write", &[Step::Write], Scope::Autocommit);

pub const READ_WRITE: Scenario =
    Scenario::new("read_write", &[Step::Read, Step::Write], Scope::Autocommit);

pub const WRITE_READ: Scenario =
    Scenario::new("write_read", &[Step::Write, Step::Read], Scope::Autocommit);

pub const READ_WRITE_TRANSACTION: Scenario = Scenario::new(
    "read_write_transaction",
    &[Step::Read, Step::Write],
    Scope::Transaction(TxMode::Deferred),
);

pub const WRITE_READ_TRANSACTION: Scenario = Scenario::new(
    "write_read_transaction",
    &[Step::Write, Step::Read],
    Scope::Transaction(TxMode::Deferred),
);

pub const READ_WRITE_TRANSACTION_IMMEDIATE: Scenario = Scenario::new(
    "read_write_transaction_immediate",
    &[Step::Read, Step::Write],
    Scope::Transaction(TxMode::Immediate),
);

/// Acknowledgment-only stand-in for [`READ_WRITE_TRANSACTION_IMMEDIATE`]
pub const IMMEDIATE_PLACEHOLDER: Scenario = Scenario::new(
    "read_write_transaction_immediate",
    &[],
    Scope::Acknowledge,
);

/// All scenarios, in the order they are listed to callers
pub const SCENARIOS: [Scenario; 8] = [
    READ,
    READ_TRANSACTION,
    WRITE,
    READ_WRITE,
    WRITE_READ,
    READ_WRITE_TRANSACTION,
    WRITE_READ_TRANSACTION,
    READ_WRITE_TRANSACTION_IMMEDIATE,
];

/// Look up a scenario by name
pub fn find(name: &str) -> Option<&'static Scenario> {
    SCENARIOS.iter().find(|s| s.name == name)
}

/// Result of a successful scenario run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// Rows produced by the read step, in read order
    Rows(Vec<Row>),
    /// Write-only or acknowledgment-only run
    Ack,
}

impl Output {
    /// Text sent back to the caller
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Rows(rows) => {
                for row in rows {
                    writeln!(f, "name: {}", row.name)?;
                }
                Ok(())
            }
            Output::Ack => writeln!(f, "ok"),
        }
    }
}

/// Statement parameters shared by every run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencerSettings {
    /// Upper bound of a read step
    pub read_limit: u32,
    /// Text stored by a write step
    pub insert_value: String,
}

impl Default for SequencerSettings {
    fn default() -> Self {
        Self {
            read_limit: 10,
            insert_value: "name".to_string(),
        }
    }
}

/// Drives scenario programs against a store
pub struct Sequencer<'a> {
    store: &'a Store,
    settings: &'a SequencerSettings,
}

impl<'a> Sequencer<'a> {
    pub fn new(store: &'a Store, settings: &'a SequencerSettings) -> Self {
        Self { store, settings }
    }

    /// Run `scenario` to completion or to its first error
    ///
    /// A transaction opened here is committed after the last step; any error
    /// returns early and the dropped context rolls back.
    pub fn run(&self, scenario: &Scenario) -> Result<Output> {
        match scenario.scope {
            Scope::Acknowledge => Ok(Output::Ack),
            Scope::Autocommit => self.run_steps(self.store, scenario.steps),
            Scope::Transaction(mode) => {
                let mut tx = self.store.begin(mode)?;
                let output = self.run_steps(&tx, scenario.steps)?;
                tx.commit()?;
                Ok(output)
            }
        }
    }

    fn run_steps<E: Executor>(&self, executor: &E, steps: &[Step]) -> Result<Output> {
        let mut rows = None;

        for (index, step) in steps.iter().enumerate() {
            match step {
                Step::Read => {
                    let read = executor
                        .read_top(self.settings.read_limit)
                        .with_context(|| format!("step {} ({}) failed", index + 1, step))?;
                    rows = Some(read);
                }
                Step::Write => {
                    executor
                        .insert_row(&self.settings.insert_value)
                        .with_context(|| format!("step {} ({}) failed", index + 1, step))?;
                }
            }
        }

        Ok(rows.map(Output::Rows).unwrap_or(Output::Ack))
    }
}
