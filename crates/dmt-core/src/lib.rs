//! dmt-core - Core library for dmt
//!
//! This crate provides the pieces of a migration run that do not touch the
//! database: file name parsing, content checksums, script discovery and
//! ordering, history record types, and configuration parsing.

pub mod catalog;
pub mod checksum;
pub mod config;
pub mod error;
pub mod record;
pub mod script;
pub mod script_name;
pub mod statements;

pub use catalog::{ScriptCatalog, ScriptOrdering, ScriptSource};
pub use checksum::compute_checksum;
pub use config::{Config, LockConfig};
pub use error::{CoreError, CoreResult};
pub use record::{MigrationRecord, NewRecord};
pub use script::MigrationScript;
pub use script_name::ScriptName;
pub use statements::transaction_control_statement;
