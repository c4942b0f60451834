//! Bootstrap of the migration history structures.

use crate::ddl::{HISTORY_DDL, HISTORY_TABLE};
use crate::error::{DbError, DbResult};
use duckdb::Connection;

/// True when the history table exists in the current database.
pub fn history_table_exists(conn: &Connection) -> DbResult<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?",
            duckdb::params![HISTORY_TABLE],
            |row| row.get(0),
        )
        .map_err(|e| DbError::SchemaError(format!("failed to check for {HISTORY_TABLE}: {e}")))?;
    Ok(count > 0)
}

/// Create the history table, its version index and the lock table if they
/// do not exist yet. Safe to call on every start-up.
pub fn ensure_history_schema(conn: &Connection) -> DbResult<()> {
    if !history_table_exists(conn)? {
        log::info!("Creating migration history table");
    }
    conn.execute_batch(HISTORY_DDL).map_err(|e| {
        DbError::SchemaError(format!("failed to create migration history structures: {e}"))
    })?;
    Ok(())
}
