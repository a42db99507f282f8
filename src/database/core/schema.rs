//! Database schema management
//!
//! The harness persists a single table. It is created on startup; a reset
//! removes the whole database file instead of dropping it.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Schema definitions for the probe database
pub struct SchemaDefinitions;

impl SchemaDefinitions {
    /// Name of the only persisted table
    pub const ROW_TABLE_NAME: &'static str = "row";

    /// SQL for creating the row table
    pub const ROW_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS row (
            id INTEGER NOT NULL PRIMARY KEY,
            name TEXT
        );
    "#;

    /// Bounded select, oldest rows first
    pub const SELECT_TOP: &'static str = "SELECT id, name FROM row ORDER BY id LIMIT ?1";

    /// Single-row insert; the identity is assigned by SQLite
    pub const INSERT_ROW: &'static str = "INSERT INTO row (name) VALUES (?1)";
}

/// Schema manager for the probe database
pub struct SchemaManager<'a> {
    conn: &'a Connection,
}

impl<'a> SchemaManager<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create the row table if absent
    pub fn initialize(&self) -> Result<()> {
        self.conn
            .execute(SchemaDefinitions::ROW_TABLE, [])
            .context("Failed to create row table")?;
        Ok(())
    }
}
