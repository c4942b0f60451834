//! Script execution and wall-clock timing.

use crate::error::{DbError, DbResult};
use crate::session::RunTransaction;
use std::time::{Duration, Instant};

/// Anything that can run a block of SQL statements.
pub trait ScriptExecutor {
    fn execute(&self, sql: &str) -> DbResult<()>;
}

impl<E: ScriptExecutor + ?Sized> ScriptExecutor for &E {
    fn execute(&self, sql: &str) -> DbResult<()> {
        (**self).execute(sql)
    }
}

impl ScriptExecutor for RunTransaction<'_> {
    fn execute(&self, sql: &str) -> DbResult<()> {
        self.conn()
            .execute_batch(sql)
            .map_err(|e| DbError::ExecutionError(e.to_string()))
    }
}

/// Wraps an executor and reports how long each call took.
///
/// The wrapped executor's result is passed through unchanged.
pub struct Timed<E> {
    inner: E,
}

impl<E: ScriptExecutor> Timed<E> {
    pub fn new(inner: E) -> Self {
        Self { inner }
    }

    /// Run `sql`, returning the result together with the elapsed time.
    pub fn execute(&self, sql: &str) -> (DbResult<()>, Duration) {
        let started = Instant::now();
        let result = self.inner.execute(sql);
        (result, started.elapsed())
    }

    pub fn into_inner(self) -> E {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use std::cell::RefCell;

    struct Recording {
        calls: RefCell<Vec<String>>,
        fail: bool,
    }

    impl ScriptExecutor for Recording {
        fn execute(&self, sql: &str) -> DbResult<()> {
            self.calls.borrow_mut().push(sql.to_string());
            std::thread::sleep(Duration::from_millis(5));
            if self.fail {
                Err(DbError::ExecutionError("boom".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_timed_passes_through_success() {
        let timed = Timed::new(Recording {
            calls: RefCell::new(Vec::new()),
            fail: false,
        });
        let (result, elapsed) = timed.execute("SELECT 1");
        assert!(result.is_ok());
        assert!(elapsed >= Duration::from_millis(5));
        assert_eq!(timed.into_inner().calls.into_inner(), vec!["SELECT 1"]);
    }

    #[test]
    fn test_timed_passes_through_failure() {
        let timed = Timed::new(Recording {
            calls: RefCell::new(Vec::new()),
            fail: true,
        });
        let (result, elapsed) = timed.execute("SELECT 1");
        assert!(matches!(result, Err(DbError::ExecutionError(_))));
        assert!(elapsed >= Duration::from_millis(5));
    }

    #[test]
    fn test_transaction_executor_runs_batches() {
        let session = Session::in_memory().unwrap();
        let tx = session.begin().unwrap();
        let timed = Timed::new(&tx);
        let (result, _) = timed.execute("CREATE TABLE a (id INT); CREATE TABLE b (id INT);");
        result.unwrap();
        let (result, _) = timed.execute("SELEC nonsense");
        assert!(result.is_err());
    }
}
