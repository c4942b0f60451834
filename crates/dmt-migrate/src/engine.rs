//! Migration run engine.
//!
//! One [`Migrator::run`] is one pass over the migrations directory inside a
//! single transaction that also holds the run lock:
//!
//! ```text
//! Idle -> LockAcquiring -> Processing -> Committing  -> Done
//!                                    \-> RollingBack -> Done
//! ```
//!
//! Atomicity is per run, not per script: if any script fails, every script
//! applied earlier in the same run is rolled back with it, and the scripts
//! after it are never looked at.
//!
//! Scripts must not manage transactions themselves. A `BEGIN`, `COMMIT`,
//! `ROLLBACK` or `END` would close the run transaction early, so a new script
//! containing one is rejected before it executes. The check is lexical; SQL
//! that reaches transaction control some other way is not detected.

use crate::error::{MigrateError, MigrateResult};
use dmt_core::statements::transaction_control_statement;
use dmt_core::{
    Config, MigrationRecord, MigrationScript, NewRecord, ScriptCatalog, ScriptOrdering,
    ScriptSource,
};
use dmt_db::schema::history_table_exists;
use dmt_db::{
    acquire, ensure_history_schema, list_history, open_session, CancelToken, HistoryStore,
    LockCoordinator, RetryPolicy, ScriptExecutor, Session, TableLock, Timed,
};
use std::fmt;
use std::path::Path;
use uuid::Uuid;

/// Phase of a run, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    LockAcquiring,
    Processing,
    Committing,
    RollingBack,
    Done,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Idle => "idle",
            RunPhase::LockAcquiring => "lock-acquiring",
            RunPhase::Processing => "processing",
            RunPhase::Committing => "committing",
            RunPhase::RollingBack => "rolling-back",
            RunPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Options for a [`Migrator`].
#[derive(Debug, Clone)]
pub struct MigratorOptions {
    /// Script ordering within the directory
    pub ordering: ScriptOrdering,
    /// Lock retry policy
    pub retry: RetryPolicy,
    /// Identity recorded in `installed_by`
    pub installed_by: String,
}

impl MigratorOptions {
    pub fn new(installed_by: impl Into<String>) -> Self {
        Self {
            ordering: ScriptOrdering::default(),
            retry: RetryPolicy::default(),
            installed_by: installed_by.into(),
        }
    }

    /// Options taken from `config`, with `installed_by` resolved by the caller.
    pub fn from_config(config: &Config, installed_by: impl Into<String>) -> Self {
        Self {
            ordering: config.migrations.ordering,
            retry: config.lock.into(),
            installed_by: installed_by.into(),
        }
    }
}

/// A script executed by a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedScript {
    pub version: u64,
    pub file_name: String,
    pub execution_time_ms: i64,
}

/// What a successful run did.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Identifier recorded as part of the lock holder
    pub run_id: String,
    /// Scripts executed and recorded by this run
    pub applied: Vec<AppliedScript>,
    /// File names already in history with a matching checksum
    pub skipped: Vec<String>,
}

impl RunSummary {
    /// True when the run found nothing new to apply
    pub fn is_up_to_date(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Outcome of processing one script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ScriptOutcome {
    Applied(AppliedScript),
    Skipped,
}

/// How far the current run has got through the catalog.
#[derive(Debug, Default)]
pub(crate) struct RunProgress {
    /// Version of the last script processed in this run (applied or skipped)
    pub(crate) last_version: u64,
}

/// Runs migrations against one database session.
pub struct Migrator<L = TableLock> {
    session: Session,
    lock: L,
    options: MigratorOptions,
    cancel: CancelToken,
}

impl Migrator<TableLock> {
    /// Migrator using the default table lock.
    pub fn new(session: Session, options: MigratorOptions) -> Self {
        Self::with_lock(session, TableLock, options)
    }

    /// Open `database` and build a migrator on it.
    ///
    /// While another process has the file open, the open is retried under
    /// `options.retry` and ends in [`MigrateError::LockTimeout`] like a
    /// contended lock row. `cancel` interrupts both waits.
    pub fn open(
        database: &str,
        options: MigratorOptions,
        cancel: CancelToken,
    ) -> MigrateResult<Self> {
        let session = open_session(database, &options.retry, &cancel)?;
        Ok(Self::new(session, options).with_cancel_token(cancel))
    }
}

impl<L: LockCoordinator> Migrator<L> {
    /// Migrator using a custom lock coordinator.
    pub fn with_lock(session: Session, lock: L, options: MigratorOptions) -> Self {
        Self {
            session,
            lock,
            options,
            cancel: CancelToken::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn options(&self) -> &MigratorOptions {
        &self.options
    }

    /// Replace the token that interrupts lock waits.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that interrupts a run while it waits for the lock.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Ensure the history and lock tables exist. Idempotent.
    pub fn init(&self) -> MigrateResult<()> {
        ensure_history_schema(self.session.conn())?;
        Ok(())
    }

    /// Recorded history, oldest first. Empty before the first `init`.
    pub fn history(&self) -> MigrateResult<Vec<MigrationRecord>> {
        if !history_table_exists(self.session.conn())? {
            return Ok(Vec::new());
        }
        Ok(list_history(self.session.conn())?)
    }

    /// Apply every pending script in `dir`, all or nothing.
    pub fn run(&self, dir: &Path) -> MigrateResult<RunSummary> {
        let run_id = Uuid::new_v4().to_string();
        let holder = format!("{}@{}", self.options.installed_by, run_id);
        let mut phase = RunPhase::Idle;

        transition(&mut phase, RunPhase::LockAcquiring, &run_id);
        let tx = match acquire(
            &self.session,
            &self.lock,
            &self.options.retry,
            &holder,
            &self.cancel,
        ) {
            Ok(tx) => tx,
            Err(e) => {
                log::error!("Could not start migration run: {e}");
                transition(&mut phase, RunPhase::Done, &run_id);
                return Err(e.into());
            }
        };

        transition(&mut phase, RunPhase::Processing, &run_id);
        let mut summary = RunSummary {
            run_id: run_id.clone(),
            ..RunSummary::default()
        };

        match self.process_directory(&tx, dir, &mut summary) {
            Ok(()) => {
                transition(&mut phase, RunPhase::Committing, &run_id);
                if summary.is_up_to_date() {
                    log::info!("No new migrations to commit. Your database is up to date!");
                } else {
                    log::info!("Committing all new migrations!");
                }
                let committed = tx.commit();
                transition(&mut phase, RunPhase::Done, &run_id);
                committed?;
                Ok(summary)
            }
            Err(e) => {
                transition(&mut phase, RunPhase::RollingBack, &run_id);
                log::info!("Rolling back all the changes...");
                if let Err(rollback_err) = tx.rollback() {
                    log::error!("Rollback failed: {rollback_err}");
                }
                transition(&mut phase, RunPhase::Done, &run_id);
                Err(e)
            }
        }
    }

    fn process_directory<S>(
        &self,
        store: &S,
        dir: &Path,
        summary: &mut RunSummary,
    ) -> MigrateResult<()>
    where
        S: HistoryStore + ScriptExecutor,
    {
        let catalog =
            ScriptCatalog::discover(dir, self.options.ordering).map_err(MigrateError::Catalog)?;
        log::debug!("Found {} migration scripts in {}", catalog.len(), dir.display());

        let mut progress = RunProgress::default();
        for source in catalog {
            let outcome =
                match process_script(store, &source, &mut progress, &self.options.installed_by) {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        log::error!(
                            "Error processing migration file: {}: {e}",
                            source.path.display()
                        );
                        return Err(e);
                    }
                };
            match outcome {
                ScriptOutcome::Applied(applied) => summary.applied.push(applied),
                ScriptOutcome::Skipped => summary.skipped.push(source.file_name),
            }
        }
        Ok(())
    }
}

/// Validate, check, and if needed apply and record one script.
pub(crate) fn process_script<S>(
    store: &S,
    source: &ScriptSource,
    progress: &mut RunProgress,
    installed_by: &str,
) -> MigrateResult<ScriptOutcome>
where
    S: HistoryStore + ScriptExecutor,
{
    let file_name = source.file_name.as_str();
    let script =
        MigrationScript::load(&source.path).map_err(|e| MigrateError::from_load(file_name, e))?;

    let expected = progress.last_version + 1;
    if script.version() != expected {
        return Err(MigrateError::VersionGap {
            script: file_name.to_string(),
            found: script.version(),
            expected,
        });
    }
    progress.last_version = expected;

    let version = script.version().to_string();
    let computed = u64::from(script.checksum);
    if let Some(recorded) = recorded_key(store, &version, script.version_key())? {
        let stored = store.checksum_of(&recorded)?.ok_or_else(|| {
            MigrateError::Database(dmt_db::DbError::InvalidValue(format!(
                "history row for version {recorded} has no checksum"
            )))
        })?;
        if stored != computed {
            return Err(MigrateError::ChecksumMismatch {
                version: recorded,
                script: file_name.to_string(),
                stored,
                computed,
            });
        }
        log::debug!("Skipping already applied migration: {file_name}");
        return Ok(ScriptOutcome::Skipped);
    }

    if let Some(statement) = transaction_control_statement(&script.content) {
        return Err(MigrateError::TransactionControl {
            script: file_name.to_string(),
            statement,
        });
    }

    log::info!("Preparing execution: {file_name}");
    let (result, elapsed) = Timed::new(store).execute(&script.content);
    result.map_err(|e| MigrateError::execution(file_name, e))?;
    let execution_time_ms = i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX);

    store.insert(&NewRecord {
        version,
        description: script.description().to_string(),
        checksum: script.checksum,
        installed_by: installed_by.to_string(),
        execution_time_ms,
    })?;
    log::info!("Applied {file_name} in {execution_time_ms} ms");

    Ok(ScriptOutcome::Applied(AppliedScript {
        version: script.version(),
        file_name: file_name.to_string(),
        execution_time_ms,
    }))
}

/// History key under which `version` was recorded, if any.
///
/// New rows use the canonical number (`V01` and `V1` are both `"1"`). Rows
/// keyed on the digits as written (`"01"`) are still honoured.
fn recorded_key<S>(store: &S, canonical: &str, as_written: &str) -> MigrateResult<Option<String>>
where
    S: HistoryStore + ?Sized,
{
    if store.exists(canonical)? {
        return Ok(Some(canonical.to_string()));
    }
    if as_written != canonical && store.exists(as_written)? {
        return Ok(Some(as_written.to_string()));
    }
    Ok(None)
}

fn transition(phase: &mut RunPhase, next: RunPhase, run_id: &str) {
    log::debug!("Run {run_id}: {phase} -> {next}");
    *phase = next;
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
