//! Error types for a migration run.
//!
//! Every variant is fatal to the run: the engine rolls the whole run back and
//! reports the error. Only lock acquisition is ever retried, and that happens
//! before any of these surface.

use dmt_core::CoreError;
use dmt_db::DbError;
use thiserror::Error;

/// Migration run errors
#[derive(Error, Debug)]
pub enum MigrateError {
    /// MG001: File name violates `V<digits>__<description>.<extension>`
    #[error("[MG001] The migration file name is invalid: ({name}). Correct format is {hint}")]
    Naming { name: String, hint: String },

    /// MG002: Applied script was edited after it ran
    #[error("[MG002] Checksum mismatch for version {version} in {script}: recorded {stored}, file now hashes to {computed}")]
    ChecksumMismatch {
        version: String,
        script: String,
        stored: u64,
        computed: u64,
    },

    /// MG003: Version does not follow the previous script by exactly one
    #[error("[MG003] Version {found} in {script} is invalid. Migration versions must increase sequentially by 1 (expected {expected})")]
    VersionGap {
        script: String,
        found: u64,
        expected: u64,
    },

    /// MG004: Lock not obtained within the retry budget
    #[error("[MG004] Migration lock not obtained; another run holds it. Gave up after {attempts} attempts")]
    LockTimeout { attempts: u32 },

    /// MG005: Lock wait was cancelled
    #[error("[MG005] Interrupted while waiting for the migration lock after {attempts} attempts")]
    LockInterrupted { attempts: u32 },

    /// MG006: Reading or executing a script failed
    #[error("[MG006] Failed to apply {script}: {message}")]
    Execution { script: String, message: String },

    /// MG007: Migration directory could not be listed
    #[error("[MG007] Failed to discover migrations: {0}")]
    Catalog(#[source] CoreError),

    /// MG008: Database failure outside of a single script
    #[error("[MG008] {0}")]
    Database(#[source] DbError),

    /// MG009: Script would end or restart the run transaction
    #[error("[MG009] {script} contains a transaction control statement ({statement}); each run already executes inside one transaction")]
    TransactionControl { script: String, statement: String },
}

/// Result type alias for MigrateError
pub type MigrateResult<T> = Result<T, MigrateError>;

impl From<DbError> for MigrateError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::LockTimeout { attempts } => MigrateError::LockTimeout { attempts },
            DbError::LockInterrupted { attempts } => MigrateError::LockInterrupted { attempts },
            other => MigrateError::Database(other),
        }
    }
}

impl MigrateError {
    /// Errors raised by a particular script, as opposed to the run itself.
    pub fn is_script_error(&self) -> bool {
        matches!(
            self,
            MigrateError::Naming { .. }
                | MigrateError::ChecksumMismatch { .. }
                | MigrateError::VersionGap { .. }
                | MigrateError::Execution { .. }
                | MigrateError::TransactionControl { .. }
        )
    }

    /// Map a script load failure: naming problems stay naming errors,
    /// anything else (I/O) is an execution failure of `script`.
    pub(crate) fn from_load(script: &str, err: CoreError) -> Self {
        match err {
            CoreError::InvalidScriptName { name, hint } => MigrateError::Naming { name, hint },
            other => MigrateError::Execution {
                script: script.to_string(),
                message: other.to_string(),
            },
        }
    }

    pub(crate) fn execution(script: &str, err: DbError) -> Self {
        MigrateError::Execution {
            script: script.to_string(),
            message: err.to_string(),
        }
    }
}
