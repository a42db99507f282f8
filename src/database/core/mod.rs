//! Core database infrastructure
//!
//! This module provides the foundational database components:
//! - `DatabaseConn`: SQLite session wrapper with the harness's pragmas
//! - `SchemaDefinitions`: the row table and its statements
//! - `SchemaManager`: Schema initialization

mod connection;
mod schema;

pub use connection::{DatabaseConn, SessionSettings};
pub use schema::{SchemaDefinitions, SchemaManager};
