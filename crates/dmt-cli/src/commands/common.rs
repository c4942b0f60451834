//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use dmt_core::Config;
use dmt_db::CancelToken;
use dmt_migrate::{MigrateError, Migrator, MigratorOptions};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::cli::GlobalArgs;

/// Exit code for a run that failed and was rolled back
pub(crate) const EXIT_RUN_FAILED: i32 = 1;

/// Exit code for a run that never obtained the migration lock
pub(crate) const EXIT_LOCK_UNAVAILABLE: i32 = 2;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors run and cleanup happens properly.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; the failure was already reported.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Exit status for a failed command
pub(crate) fn exit_code_for(err: &MigrateError) -> i32 {
    match err {
        MigrateError::LockTimeout { .. } | MigrateError::LockInterrupted { .. } => {
            EXIT_LOCK_UNAVAILABLE
        }
        _ => EXIT_RUN_FAILED,
    }
}

/// Report `err` on stderr and turn it into the matching [`ExitCode`].
pub(crate) fn fail(action: &str, err: &MigrateError) -> anyhow::Error {
    eprintln!("{action} failed: {err}");
    ExitCode(exit_code_for(err)).into()
}

/// Configuration and identity resolved from flags, environment and dmt.yml.
#[derive(Debug)]
pub(crate) struct CommandContext {
    /// Loaded (or default) configuration
    pub(crate) config: Config,
    /// Directory config-relative paths are resolved against
    pub(crate) root: PathBuf,
    /// Database path after applying `--database`
    pub(crate) database: String,
    /// Identity recorded as `installed_by`
    pub(crate) installed_by: String,
}

impl CommandContext {
    /// Resolve the context for one command invocation
    pub(crate) fn load(global: &GlobalArgs) -> Result<Self> {
        let (config, root) = match &global.config {
            Some(path) => {
                let path = Path::new(path);
                let config = Config::load(path).context("Failed to load configuration file")?;
                let root = path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."));
                (config, root)
            }
            None => {
                let root = PathBuf::from(".");
                let config =
                    Config::load_from_dir(&root).context("Failed to load configuration")?;
                (config, root)
            }
        };

        let database = match &global.database {
            Some(db) => db.clone(),
            None => config.database_path_absolute(&root),
        };
        let installed_by = config.resolve_installed_by(global.username.as_deref());

        Ok(Self {
            config,
            root,
            database,
            installed_by,
        })
    }

    /// Migrator options from config, before any command-line overrides
    pub(crate) fn options(&self) -> MigratorOptions {
        MigratorOptions::from_config(&self.config, self.installed_by.clone())
    }

    /// Open the resolved database, waiting while another process holds it
    pub(crate) fn open_migrator(
        &self,
        options: MigratorOptions,
        cancel: CancelToken,
    ) -> Result<Migrator, MigrateError> {
        log::debug!("Opening database {}", self.database);
        Migrator::open(&self.database, options, cancel)
    }

    /// Migrations directory: `override_dir` as given, else from config
    pub(crate) fn migrations_dir(&self, override_dir: Option<&str>) -> PathBuf {
        match override_dir {
            Some(dir) => PathBuf::from(dir),
            None => self.config.migrations_dir_absolute(&self.root),
        }
    }
}
