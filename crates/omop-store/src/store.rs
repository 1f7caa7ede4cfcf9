//! Connection ownership, schema creation and scoped transactions.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Transaction};
use tracing::debug;

use omop_model::TableDef;

use crate::error::{Result, StoreError};

/// The relational store shared by every step of one run.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open a SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        configure_pragmas(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        configure_pragmas(&conn)?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Whether a transaction is currently open on the connection.
    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    /// Run `f` inside a scoped transaction.
    ///
    /// When no transaction is open, one is started, committed when `f`
    /// returns `Ok` and rolled back otherwise. When a transaction is already
    /// open (an enclosing run transaction), `f` joins it and commit or
    /// rollback is left to its owner.
    pub fn transaction<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&Connection) -> std::result::Result<T, E>,
        E: From<StoreError>,
    {
        if self.in_transaction() {
            return f(&self.conn);
        }
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(StoreError::from)?;
        // Dropping `tx` on the error path rolls it back.
        let value = f(&*tx)?;
        tx.commit().map_err(StoreError::from)?;
        Ok(value)
    }

    /// Begin the enclosing transaction of a whole run.
    pub fn begin(&self) -> Result<Transaction<'_>> {
        Ok(self.conn.unchecked_transaction()?)
    }

    /// Create every given table that does not exist yet.
    pub fn create_tables(&self, tables: &[TableDef]) -> Result<()> {
        for table in tables {
            debug!(table = table.name, "create table");
            self.conn
                .execute_batch(&table.create_sql())
                .map_err(|e| StoreError::SchemaFailed {
                    table: table.name.to_string(),
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }

    pub fn table_exists(&self, name: &str) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
                [name],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Names from `names` that have no table in the database.
    pub fn missing_tables(&self, names: &[&str]) -> Result<Vec<String>> {
        let mut missing = Vec::new();
        for name in names {
            if !self.table_exists(name)? {
                missing.push((*name).to_string());
            }
        }
        Ok(missing)
    }

    /// Row count of a registered table.
    pub fn count_rows(&self, table: &TableDef) -> Result<i64> {
        if !self.table_exists(table.name)? {
            return Err(StoreError::MissingTable(table.name.to_string()));
        }
        let count = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table.name),
            [],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(count)
    }
}

fn configure_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode=DELETE;
         PRAGMA foreign_keys=OFF;",
    )?;
    Ok(())
}
