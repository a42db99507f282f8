#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! txprobe - an SQLite locking probe
//!
//! txprobe exposes a fixed set of read/write orderings against one shared,
//! file-backed SQLite database so that SQLite's concurrency behavior can be
//! observed under load: deferred vs. immediate transaction acquisition,
//! reader/writer interleaving under WAL, and rollback of abandoned
//! transactions.
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | `database` | Store, transaction contexts, scenario programs and config | `rusqlite`, `config` |
//! | `cli` | Binary with the HTTP trigger server | All above + `clap`, `axum` |
//!
//! # Architecture
//!
//! - **`database`**: the shared [`Store`] handle and [`TransactionContext`]
//! - **`scenario`**: scenario programs as data, the [`Sequencer`] that runs
//!   them and the [`Dispatcher`] that maps names to programs
//! - **`config`**: configuration management
//! - **`server`**: axum routes, one per scenario (requires `cli`)
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use txprobe::{Dispatcher, SequencerSettings, SessionSettings, Store};
//!
//! let store = Store::bootstrap("./db.sqlite3", SessionSettings::default())?;
//! let dispatcher = Dispatcher::new(Arc::new(store), SequencerSettings::default());
//!
//! print!("{}", dispatcher.execute("write")?.render());       // ok
//! print!("{}", dispatcher.execute("write_read")?.render());  // name: name (x2)
//! ```

// Database layer - requires database feature
#[cfg(feature = "database")]
pub mod config;
#[cfg(feature = "database")]
pub mod database;
#[cfg(feature = "database")]
pub mod scenario;

// Server module - requires CLI feature
#[cfg(feature = "cli")]
pub mod server;

#[cfg(feature = "database")]
pub use config::ProbeConfig;

#[cfg(feature = "database")]
pub use database::{
    is_busy, DatabaseConn, Executor, Row, SessionSettings, Store, TransactionContext, TxMode,
    TxState,
};

#[cfg(feature = "database")]
pub use scenario::{
    DispatchError, Dispatcher, ErrorKind, Output, Scenario, Scope, Sequencer, SequencerSettings,
    Step, SCENARIOS,
};

#[cfg(feature = "cli")]
pub use server::{create_axum_router, start_server, ServerConfig, ServerState};
