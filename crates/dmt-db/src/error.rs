//! Error types for dmt-db

use thiserror::Error;

/// Database layer errors.
#[derive(Error, Debug)]
pub enum DbError {
    /// Failed to open the database (D001).
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// SQL execution error (D002).
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// BEGIN / COMMIT / ROLLBACK failed (D003).
    #[error("[D003] Transaction failed: {0}")]
    TransactionError(String),

    /// History bootstrap failed or the history structures are missing (D004).
    #[error("[D004] Migration history schema error: {0}")]
    SchemaError(String),

    /// A history row for this version already exists (D005).
    #[error("[D005] Migration history already contains version {version}")]
    DuplicateVersion { version: String },

    /// One lock attempt lost to another transaction (D006).
    #[error("[D006] Migration lock is held by another run: {0}")]
    LockConflict(String),

    /// Lock not acquired within the retry budget (D007).
    #[error("[D007] Could not lock migration history after {attempts} attempts")]
    LockTimeout { attempts: u32 },

    /// Lock wait cancelled between attempts (D008).
    #[error("[D008] Interrupted while waiting for the migration lock after {attempts} attempts")]
    LockInterrupted { attempts: u32 },

    /// Stored value could not be decoded (D009).
    #[error("[D009] Invalid value in migration history: {0}")]
    InvalidValue(String),

    /// DuckDB driver error with preserved source chain (D010).
    #[error("[D010] DuckDB error")]
    DuckDb(#[source] duckdb::Error),

    /// Database file is held open by another process (D011).
    #[error("[D011] Database file is locked by another process: {0}")]
    DatabaseLocked(String),
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        DbError::DuckDb(err)
    }
}

/// True for DuckDB errors raised because a table or column does not exist.
///
/// duckdb::Error exposes no structured variants, so this matches on the
/// message prefix DuckDB uses for binder/catalog failures.
pub(crate) fn is_catalog_error(err: &duckdb::Error) -> bool {
    let msg = err.to_string();
    msg.contains("Catalog Error") || msg.contains("Binder Error")
}

/// True for unique / primary key violations.
pub(crate) fn is_constraint_violation(err: &duckdb::Error) -> bool {
    let msg = err.to_string();
    msg.contains("Constraint Error")
        || msg.contains("Duplicate key")
        || msg.contains("violates primary key")
        || msg.contains("violates unique")
}

/// True when another process holds DuckDB's lock on the database file.
pub(crate) fn is_file_lock_error(err: &duckdb::Error) -> bool {
    err.to_string().contains("Could not set lock on file")
}
