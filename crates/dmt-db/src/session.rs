//! Database session and run-scoped transaction.
//!
//! [`Session`] owns a DuckDB [`Connection`]. [`RunTransaction`] wraps an
//! explicit `BEGIN` ... `COMMIT` / `ROLLBACK` pair and rolls back on drop, so
//! anything scoped to the transaction (the migration lock included) ends with
//! it on every exit path.

use crate::error::{is_file_lock_error, DbError, DbResult};
use duckdb::Connection;
use std::path::Path;

/// Special path that opens an in-memory database.
pub const MEMORY_PATH: &str = ":memory:";

/// Owned connection to the target database.
///
/// Single-threaded: the engine drives one run at a time on one session.
pub struct Session {
    conn: Connection,
}

impl Session {
    /// Open (or create) the database at `path`; `:memory:` opens an
    /// in-memory database.
    ///
    /// A file held by another process fails with [`DbError::DatabaseLocked`];
    /// [`crate::lock::open_session`] retries that case.
    pub fn open(path: &str) -> DbResult<Self> {
        if path == MEMORY_PATH {
            return Self::in_memory();
        }
        let conn = Connection::open(Path::new(path)).map_err(|e| {
            if is_file_lock_error(&e) {
                DbError::DatabaseLocked(format!("{path}: {e}"))
            } else {
                DbError::ConnectionError(format!("{e}: {path}"))
            }
        })?;
        log::debug!("Opened database {path}");
        Ok(Self { conn })
    }

    /// Open a fresh in-memory database.
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Wrap an existing connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Open a second, independent connection to the same database.
    ///
    /// Each connection runs its own transactions, which is how two runs
    /// against one in-process database contend for the lock.
    pub fn try_clone(&self) -> DbResult<Self> {
        let conn = self
            .conn
            .try_clone()
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Borrow the underlying DuckDB connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Start a transaction on this session.
    pub fn begin(&self) -> DbResult<RunTransaction<'_>> {
        self.conn
            .execute_batch("BEGIN TRANSACTION")
            .map_err(|e| DbError::TransactionError(format!("BEGIN failed: {e}")))?;
        Ok(RunTransaction {
            conn: &self.conn,
            finished: false,
        })
    }
}

/// An open transaction. Rolled back on drop unless committed.
pub struct RunTransaction<'c> {
    conn: &'c Connection,
    finished: bool,
}

impl<'c> RunTransaction<'c> {
    /// Connection the transaction runs on.
    pub fn conn(&self) -> &'c Connection {
        self.conn
    }

    /// Commit, rolling back if the commit itself fails.
    pub fn commit(mut self) -> DbResult<()> {
        self.finished = true;
        if let Err(commit_err) = self.conn.execute_batch("COMMIT") {
            let _ = self.conn.execute_batch("ROLLBACK");
            return Err(DbError::TransactionError(format!(
                "COMMIT failed: {commit_err}"
            )));
        }
        Ok(())
    }

    /// Roll back every change made in this transaction.
    pub fn rollback(mut self) -> DbResult<()> {
        self.finished = true;
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(|e| DbError::TransactionError(format!("ROLLBACK failed: {e}")))
    }
}

impl Drop for RunTransaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                log::warn!("Implicit rollback failed: {e}");
            }
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
