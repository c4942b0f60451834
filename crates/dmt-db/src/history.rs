//! Applied-migration history: lookups and the append-only insert.
//!
//! The history is a write-once audit log. Rows are inserted exactly once when
//! a script is first applied and never updated or deleted.

use crate::error::{is_constraint_violation, DbError, DbResult};
use crate::session::RunTransaction;
use chrono::NaiveDateTime;
use dmt_core::{MigrationRecord, NewRecord};
use duckdb::Connection;

/// History capability the engine needs while a run is in progress.
///
/// Implementations operate inside whatever transaction the caller holds.
pub trait HistoryStore {
    /// Whether a record for `version` exists
    fn exists(&self, version: &str) -> DbResult<bool>;

    /// Stored checksum for `version`, if recorded
    fn checksum_of(&self, version: &str) -> DbResult<Option<u64>>;

    /// Append a record. A duplicate version is an error, never ignored.
    fn insert(&self, record: &NewRecord) -> DbResult<()>;
}

impl HistoryStore for RunTransaction<'_> {
    fn exists(&self, version: &str) -> DbResult<bool> {
        version_exists(self.conn(), version)
    }

    fn checksum_of(&self, version: &str) -> DbResult<Option<u64>> {
        stored_checksum(self.conn(), version)
    }

    fn insert(&self, record: &NewRecord) -> DbResult<()> {
        insert_record(self.conn(), record)
    }
}

fn version_exists(conn: &Connection, version: &str) -> DbResult<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM migration_history WHERE version = ?",
            duckdb::params![version],
            |row| row.get(0),
        )
        .map_err(|e| DbError::ExecutionError(format!("history lookup for {version}: {e}")))?;
    Ok(count > 0)
}

fn stored_checksum(conn: &Connection, version: &str) -> DbResult<Option<u64>> {
    let checksum = conn.query_row(
        "SELECT checksum FROM migration_history WHERE version = ?",
        duckdb::params![version],
        |row| row.get::<_, i64>(0),
    );
    match checksum {
        Ok(value) => u64::try_from(value).map(Some).map_err(|_| {
            DbError::InvalidValue(format!("negative checksum {value} for version {version}"))
        }),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(DbError::ExecutionError(format!(
            "checksum lookup for {version}: {e}"
        ))),
    }
}

fn insert_record(conn: &Connection, record: &NewRecord) -> DbResult<()> {
    conn.execute(
        "INSERT INTO migration_history (version, description, checksum, installed_by, execution_time_ms)
         VALUES (?, ?, ?, ?, ?)",
        duckdb::params![
            record.version,
            record.description,
            i64::from(record.checksum),
            record.installed_by,
            record.execution_time_ms,
        ],
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            DbError::DuplicateVersion {
                version: record.version.clone(),
            }
        } else {
            DbError::ExecutionError(format!("insert history for {}: {e}", record.version))
        }
    })?;
    Ok(())
}

/// Read the whole history in the order it was written.
pub fn list_history(conn: &Connection) -> DbResult<Vec<MigrationRecord>> {
    let mut stmt = conn
        .prepare(
            "SELECT version, description, checksum, installed_by,
                    CAST(executed_at AS VARCHAR), execution_time_ms
             FROM migration_history
             ORDER BY id",
        )
        .map_err(|e| DbError::ExecutionError(format!("prepare history query: {e}")))?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<i64>>(5)?,
            ))
        })
        .map_err(|e| DbError::ExecutionError(format!("query history: {e}")))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| DbError::ExecutionError(format!("history row: {e}")))?;

    rows.into_iter()
        .map(
            |(version, description, checksum, installed_by, executed_at, execution_time_ms)| {
                let checksum = u64::try_from(checksum).map_err(|_| {
                    DbError::InvalidValue(format!("negative checksum for version {version}"))
                })?;
                let executed_at = executed_at.as_deref().map(parse_timestamp).transpose()?;
                Ok(MigrationRecord {
                    version,
                    description,
                    checksum,
                    installed_by,
                    executed_at,
                    execution_time_ms,
                })
            },
        )
        .collect()
}

/// Parse DuckDB's `TIMESTAMP` text form (`2024-05-01 12:30:00[.ffffff]`).
fn parse_timestamp(text: &str) -> DbResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .map_err(|e| DbError::InvalidValue(format!("executed_at '{text}': {e}")))
}

#[cfg(test)]
#[path = "history_test.rs"]
mod tests;
