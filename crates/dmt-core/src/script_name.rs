//! Migration file name grammar: `V<digits>__<description>.<extension>`.
//!
//! The double underscore is the only separator the grammar requires. Version
//! and description extraction are deliberately looser than [`validate`] so
//! callers can use them independently.

use crate::error::{CoreError, CoreResult};
use std::sync::OnceLock;

/// Separator between the version prefix and the description.
pub const SEPARATOR: &str = "__";

fn name_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        regex::Regex::new(r"^V\d+__.+\.[a-zA-Z0-9]+$").expect("valid regex literal")
    })
}

/// Check that `name` matches the full migration file name grammar.
pub fn validate(name: &str) -> CoreResult<()> {
    if name_pattern().is_match(name) {
        Ok(())
    } else {
        Err(CoreError::invalid_name(name))
    }
}

/// Return the version digits of `name` as written, without the leading `V`.
///
/// Everything between the first character and the first `__` is returned, so
/// the result is only guaranteed to be numeric for names that pass
/// [`validate`].
pub fn version_of(name: &str) -> &str {
    let prefix = name.split(SEPARATOR).next().unwrap_or(name);
    prefix.get(1..).unwrap_or("")
}

/// Return the human-readable description encoded in `name`.
///
/// Takes everything after the first `__`, drops the extension (text after the
/// last `.`), then turns every `_` into a space.
pub fn description_of(name: &str) -> CoreResult<String> {
    let Some((_, rest)) = name.split_once(SEPARATOR) else {
        return Err(CoreError::invalid_name(name));
    };
    let stem = match rest.rfind('.') {
        Some(dot) => &rest[..dot],
        None => rest,
    };
    Ok(stem.replace('_', " "))
}

/// A validated migration file name with its parsed parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptName {
    /// Full file name, e.g. `V3__add_index.sql`
    pub file_name: String,
    /// Version digits as written in the file name
    pub version_text: String,
    /// Numeric version
    pub version: u64,
    /// Description with underscores replaced by spaces
    pub description: String,
}

impl ScriptName {
    /// Validate `file_name` and extract its version and description.
    pub fn parse(file_name: &str) -> CoreResult<Self> {
        validate(file_name)?;
        let version_text = version_of(file_name);
        let version = version_text
            .parse::<u64>()
            .map_err(|_| CoreError::InvalidScriptName {
                name: file_name.to_string(),
                hint: format!("a version between 1 and {}", u64::MAX),
            })?;
        Ok(Self {
            file_name: file_name.to_string(),
            version_text: version_text.to_string(),
            version,
            description: description_of(file_name)?,
        })
    }
}

#[cfg(test)]
#[path = "script_name_test.rs"]
mod tests;
