//! History record types.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A row of the applied-migration history, as read back from the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationRecord {
    /// Version key as it appears in the file name (e.g. `"1"`, `"007"`)
    pub version: String,

    /// Description derived from the file name
    pub description: Option<String>,

    /// CRC-32 of the script content when it was applied
    pub checksum: u64,

    /// Identity of whoever ran the migration
    pub installed_by: String,

    /// When the row was written
    pub executed_at: Option<NaiveDateTime>,

    /// Wall-clock execution time of the script
    pub execution_time_ms: Option<i64>,
}

/// The fields the engine supplies when recording a newly applied script.
///
/// `executed_at` is filled in by the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub version: String,
    pub description: String,
    pub checksum: u32,
    pub installed_by: String,
    pub execution_time_ms: i64,
}
