//! Configuration types and parsing for dmt.yml

use crate::catalog::ScriptOrdering;
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file names searched by [`Config::load_from_dir`], in order
pub const CONFIG_FILE_NAMES: &[&str] = &["dmt.yml", "dmt.yaml"];

/// Fallback identity when nothing else is configured
pub const UNKNOWN_USER: &str = "unknown";

/// Main tool configuration from dmt.yml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Database connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Migration script discovery settings
    #[serde(default)]
    pub migrations: MigrationsConfig,

    /// History lock retry policy
    #[serde(default)]
    pub lock: LockConfig,

    /// Identity recorded as `installed_by` for applied scripts
    #[serde(default)]
    pub installed_by: Option<String>,
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// DuckDB file path, or `:memory:`
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Where migration scripts live and how they are ordered
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationsConfig {
    /// Directory containing `V<n>__<description>.sql` files
    #[serde(default = "default_migrations_dir")]
    pub directory: String,

    /// Script ordering (default: lexicographic)
    #[serde(default)]
    pub ordering: ScriptOrdering,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            directory: default_migrations_dir(),
            ordering: ScriptOrdering::default(),
        }
    }
}

/// Retry policy for acquiring the history lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LockConfig {
    /// Total number of acquisition attempts
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between attempts in milliseconds
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_interval_ms: default_retry_interval_ms(),
        }
    }
}

impl LockConfig {
    /// Delay between attempts
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

fn default_db_path() -> String {
    "dmt.duckdb".to_string()
}

fn default_migrations_dir() -> String {
    "migrations".to_string()
}

fn default_max_attempts() -> u32 {
    50
}

fn default_retry_interval_ms() -> u64 {
    1000
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| CoreError::ConfigParseError {
                message: format!("{}: {e}", path.display()),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a directory, falling back to defaults when no
    /// dmt.yml / dmt.yaml is present
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        for name in CONFIG_FILE_NAMES {
            let path = dir.join(name);
            if path.exists() {
                return Self::load(&path);
            }
        }
        log::debug!("No config file in {}, using defaults", dir.display());
        Ok(Self::default())
    }

    /// Validate the configuration
    pub fn validate(&self) -> CoreResult<()> {
        if self.database.path.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "database.path cannot be empty".to_string(),
            });
        }
        if self.migrations.directory.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "migrations.directory cannot be empty".to_string(),
            });
        }
        if self.lock.max_attempts == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "lock.max_attempts must be at least 1".to_string(),
            });
        }
        if matches!(&self.installed_by, Some(user) if user.trim().is_empty()) {
            return Err(CoreError::ConfigInvalid {
                message: "installed_by cannot be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Migrations directory resolved against `root` unless already absolute
    pub fn migrations_dir_absolute(&self, root: &Path) -> PathBuf {
        root.join(&self.migrations.directory)
    }

    /// Database path resolved against `root`; `:memory:` is passed through
    pub fn database_path_absolute(&self, root: &Path) -> String {
        if self.database.path == ":memory:" {
            return self.database.path.clone();
        }
        root.join(&self.database.path).display().to_string()
    }

    /// Identity for `installed_by`: `explicit`, then config, then the
    /// `USER` / `USERNAME` environment variables
    pub fn resolve_installed_by(&self, explicit: Option<&str>) -> String {
        explicit
            .map(str::to_string)
            .or_else(|| self.installed_by.clone())
            .or_else(|| std::env::var("USER").ok())
            .or_else(|| std::env::var("USERNAME").ok())
            .filter(|user| !user.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_USER.to_string())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
