//! Error types for dmt-core

use thiserror::Error;

/// Expected shape of a migration file name, included in naming errors.
pub const SCRIPT_NAME_HINT: &str =
    "V(version)__(description).(extension), e.g., V1__create_table.sql";

/// Core error type for dmt
#[derive(Error, Debug)]
pub enum CoreError {
    /// C001: Migration file name does not match the grammar
    #[error("[C001] The migration file name is invalid: ({name}). Correct format is {hint}")]
    InvalidScriptName { name: String, hint: String },

    /// C002: Migration directory not found
    #[error("[C002] Migration directory not found: {path}")]
    ScriptDirNotFound { path: String },

    /// C003: Configuration file not found
    #[error("[C003] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// C004: Failed to parse configuration file
    #[error("[C004] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// C005: Invalid configuration value
    #[error("[C005] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// C006: IO error with file path context
    #[error("[C006] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },
}

impl CoreError {
    /// Naming error for `name` carrying the standard format hint.
    pub fn invalid_name(name: impl Into<String>) -> Self {
        CoreError::InvalidScriptName {
            name: name.into(),
            hint: SCRIPT_NAME_HINT.to_string(),
        }
    }
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
