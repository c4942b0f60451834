//! Cross-run exclusive lock on the migration history.
//!
//! The lock is always taken inside the run's transaction and needs no
//! explicit release: it ends when the transaction commits, rolls back, or the
//! connection goes away. Competing runs do not queue; each retries on its own
//! with a fixed delay until its attempt budget runs out.

use crate::ddl::{LOCK_ROW_ID, LOCK_TABLE};
use crate::error::{is_catalog_error, DbError, DbResult};
use crate::session::{RunTransaction, Session};
use dmt_core::LockConfig;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// One lock attempt inside an open transaction.
///
/// Return [`DbError::LockConflict`] when another run holds the lock; that is
/// the only error [`acquire`] retries.
pub trait LockCoordinator {
    /// Try once to take the lock for `holder`.
    fn try_acquire(&self, tx: &RunTransaction<'_>, holder: &str) -> DbResult<()>;
}

/// Default coordinator: claims the single row of `migration_lock`.
///
/// DuckDB rejects a write to a row that another open transaction has already
/// written, so the first run to update the row excludes every other until
/// its transaction ends.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableLock;

impl LockCoordinator for TableLock {
    fn try_acquire(&self, tx: &RunTransaction<'_>, holder: &str) -> DbResult<()> {
        let sql = format!(
            "UPDATE {LOCK_TABLE} SET holder = ?, acquired_at = current_timestamp WHERE lock_id = ?"
        );
        let updated = tx
            .conn()
            .execute(&sql, duckdb::params![holder, LOCK_ROW_ID])
            .map_err(|e| {
                if is_catalog_error(&e) {
                    DbError::SchemaError(format!("{LOCK_TABLE} is not initialized: {e}"))
                } else {
                    DbError::LockConflict(e.to_string())
                }
            })?;
        if updated == 0 {
            return Err(DbError::SchemaError(format!(
                "{LOCK_TABLE} has no lock row; run init first"
            )));
        }
        Ok(())
    }
}

/// How many times to try for the lock and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Sleep between attempts
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        LockConfig::default().into()
    }
}

impl From<LockConfig> for RetryPolicy {
    fn from(config: LockConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            interval: config.retry_interval(),
        }
    }
}

/// Cancels a lock wait from another thread.
///
/// Only the sleep between attempts is interruptible; a run that already holds
/// the lock is not affected.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the token, waking any waiter.
    pub fn cancel(&self) {
        let (flag, signal) = &*self.inner;
        *flag.lock().unwrap_or_else(|e| e.into_inner()) = true;
        signal.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Sleep for `timeout` or until cancelled. Returns `true` if cancelled.
    fn wait(&self, timeout: Duration) -> bool {
        let (flag, signal) = &*self.inner;
        let guard = flag.lock().unwrap_or_else(|e| e.into_inner());
        let (guard, _) = signal
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(|e| e.into_inner());
        *guard
    }
}

/// Begin a transaction on `session` and take the lock in it, retrying per
/// `policy`.
///
/// Each failed attempt rolls its transaction back before waiting, so the
/// returned transaction is always fresh and already holds the lock.
pub fn acquire<'c, L>(
    session: &'c Session,
    coordinator: &L,
    policy: &RetryPolicy,
    holder: &str,
    cancel: &CancelToken,
) -> DbResult<RunTransaction<'c>>
where
    L: LockCoordinator + ?Sized,
{
    let tx = retry_contended(
        policy,
        cancel,
        "History table is locked by another run",
        || {
            let tx = session.begin()?;
            match coordinator.try_acquire(&tx, holder) {
                Ok(()) => Ok(tx),
                Err(e) => {
                    if let Err(rollback_err) = tx.rollback() {
                        log::warn!("Rollback after failed lock attempt failed: {rollback_err}");
                    }
                    Err(e)
                }
            }
        },
    )?;
    log::debug!("Migration lock acquired by {holder}");
    Ok(tx)
}

/// Open the database at `path`, waiting per `policy` while another process
/// has the file open.
///
/// DuckDB allows a single writing process per file, so a second `dmt`
/// contends here before it ever reaches the lock table.
pub fn open_session(path: &str, policy: &RetryPolicy, cancel: &CancelToken) -> DbResult<Session> {
    retry_contended(
        policy,
        cancel,
        "Database file is locked by another process",
        || match Session::open(path) {
            Err(DbError::DatabaseLocked(reason)) => Err(DbError::LockConflict(reason)),
            other => other,
        },
    )
}

/// Run `attempt` until it succeeds, fails with anything other than
/// [`DbError::LockConflict`], or the budget in `policy` runs out.
fn retry_contended<T, F>(
    policy: &RetryPolicy,
    cancel: &CancelToken,
    waiting_on: &str,
    mut attempt: F,
) -> DbResult<T>
where
    F: FnMut() -> DbResult<T>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(DbError::LockInterrupted { attempts });
        }
        attempts += 1;

        match attempt() {
            Ok(value) => {
                log::debug!("Contended step succeeded on attempt {attempts}");
                return Ok(value);
            }
            Err(DbError::LockConflict(reason)) => {
                let remaining = max_attempts - attempts;
                if remaining == 0 {
                    log::error!("{waiting_on}; giving up after {attempts} attempts: {reason}");
                    return Err(DbError::LockTimeout { attempts });
                }
                log::warn!("{waiting_on}. Waiting to unlock. {remaining} attempts left.");
                if cancel.wait(policy.interval) {
                    return Err(DbError::LockInterrupted { attempts });
                }
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
#[path = "lock_test.rs"]
mod tests;
