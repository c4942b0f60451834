//! Embedded DDL for the migration history structures.
//!
//! Every statement is idempotent (`IF NOT EXISTS` / guarded insert) so the
//! whole batch can run on every start-up.

/// Table recording one row per applied script.
pub const HISTORY_TABLE: &str = "migration_history";

/// Single-row table whose row is updated to take the run lock.
pub const LOCK_TABLE: &str = "migration_lock";

/// Key of the lock row.
pub const LOCK_ROW_ID: i32 = 1;

/// History table, version index, lock table and lock row.
pub static HISTORY_DDL: &str = include_str!("history.sql");
