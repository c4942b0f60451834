//! Migration script discovery.
//!
//! Lists a single directory (non-recursive), keeps files ending in `.sql`
//! (case-insensitive) and orders them. File contents are not read here.

use crate::error::{CoreError, CoreResult};
use crate::script_name;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Recognized migration script extension (compared case-insensitively)
pub const SCRIPT_EXTENSION: &str = ".sql";

/// How discovered scripts are ordered before a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScriptOrdering {
    /// Plain string order of file names (`V10__` sorts before `V2__`)
    #[default]
    Lexicographic,
    /// Order by parsed version; names without a parseable version go last
    Numeric,
}

impl std::fmt::Display for ScriptOrdering {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScriptOrdering::Lexicographic => write!(f, "lexicographic"),
            ScriptOrdering::Numeric => write!(f, "numeric"),
        }
    }
}

/// A candidate script file found in the migrations directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSource {
    /// File name without directory
    pub file_name: String,
    /// Full path to the file
    pub path: PathBuf,
}

/// Ordered set of candidate scripts, consumed once per run.
#[derive(Debug)]
pub struct ScriptCatalog {
    sources: Vec<ScriptSource>,
}

impl ScriptCatalog {
    /// Discover script files in `dir` and order them.
    pub fn discover(dir: &Path, ordering: ScriptOrdering) -> CoreResult<Self> {
        if !dir.is_dir() {
            return Err(CoreError::ScriptDirNotFound {
                path: dir.display().to_string(),
            });
        }

        let io_err = |e: std::io::Error| CoreError::IoWithPath {
            path: dir.display().to_string(),
            source: e,
        };

        let mut sources = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            if !entry.file_type().map_err(io_err)?.is_file() {
                continue;
            }
            let Some(file_name) = entry.file_name().to_str().map(str::to_string) else {
                log::warn!("Skipping non UTF-8 file name in {}", dir.display());
                continue;
            };
            if !is_script_file(&file_name) {
                log::debug!("Ignoring non-script file: {}", file_name);
                continue;
            }
            sources.push(ScriptSource {
                file_name,
                path: entry.path(),
            });
        }

        sort_sources(&mut sources, ordering);
        Ok(Self { sources })
    }

    /// Number of discovered scripts
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// True when no scripts were found
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// File names in run order
    pub fn file_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.file_name.as_str()).collect()
    }
}

impl IntoIterator for ScriptCatalog {
    type Item = ScriptSource;
    type IntoIter = std::vec::IntoIter<ScriptSource>;

    fn into_iter(self) -> Self::IntoIter {
        self.sources.into_iter()
    }
}

/// True when `file_name` carries the script extension, ignoring case.
pub fn is_script_file(file_name: &str) -> bool {
    file_name.to_lowercase().ends_with(SCRIPT_EXTENSION)
}

fn sort_sources(sources: &mut [ScriptSource], ordering: ScriptOrdering) {
    match ordering {
        ScriptOrdering::Lexicographic => sources.sort_by(|a, b| a.file_name.cmp(&b.file_name)),
        ScriptOrdering::Numeric => sources.sort_by(|a, b| {
            numeric_key(&a.file_name)
                .cmp(&numeric_key(&b.file_name))
                .then_with(|| a.file_name.cmp(&b.file_name))
        }),
    }
}

/// Sort key for numeric ordering. `None` sorts after every parsed version.
fn numeric_key(file_name: &str) -> (bool, u64) {
    match script_name::version_of(file_name).parse::<u64>() {
        Ok(v) if file_name.starts_with('V') => (false, v),
        _ => (true, 0),
    }
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
