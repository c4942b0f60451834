//! DuckDB layer for dmt.
//!
//! Owns everything a migration run does against the database: the session
//! and its run-scoped transaction, the append-only history table, the
//! exclusive run lock, and timed script execution.

pub mod ddl;
pub mod error;
pub mod history;
pub mod lock;
pub mod schema;
pub mod session;
pub mod timing;

pub use error::{DbError, DbResult};
pub use history::{list_history, HistoryStore};
pub use lock::{acquire, open_session, CancelToken, LockCoordinator, RetryPolicy, TableLock};
pub use schema::ensure_history_schema;
pub use session::{RunTransaction, Session};
pub use timing::{ScriptExecutor, Timed};
