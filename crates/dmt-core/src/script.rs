//! Migration script loaded from disk.

use crate::checksum::compute_checksum;
use crate::error::{CoreError, CoreResult};
use crate::script_name::ScriptName;
use std::path::{Path, PathBuf};

/// A versioned SQL change-script, constructed fresh for every run.
#[derive(Debug, Clone)]
pub struct MigrationScript {
    /// Parsed file name
    pub name: ScriptName,

    /// Raw SQL text
    pub content: String,

    /// CRC-32 of `content`
    pub checksum: u32,

    /// Path the script was read from
    pub path: PathBuf,
}

impl MigrationScript {
    /// Build a script from an already-validated name and its content.
    pub fn new(name: ScriptName, content: String, path: PathBuf) -> Self {
        let checksum = compute_checksum(content.as_bytes());
        Self {
            name,
            content,
            checksum,
            path,
        }
    }

    /// Read and parse the script at `path`.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let file_name = file_name_of(path)?;
        let name = ScriptName::parse(&file_name)?;
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(Self::new(name, content, path.to_path_buf()))
    }

    /// Numeric version
    pub fn version(&self) -> u64 {
        self.name.version
    }

    /// Version key as stored in the history table
    pub fn version_key(&self) -> &str {
        &self.name.version_text
    }

    /// Human-readable description
    pub fn description(&self) -> &str {
        &self.name.description
    }

    /// File name used in diagnostics
    pub fn file_name(&self) -> &str {
        &self.name.file_name
    }
}

/// Extract the UTF-8 file name component of `path`.
pub(crate) fn file_name_of(path: &Path) -> CoreResult<String> {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| CoreError::invalid_name(path.display().to_string()))
}
