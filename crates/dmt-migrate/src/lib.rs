//! Migration engine for dmt.
//!
//! Drives one run: take the lock, walk the scripts in order, apply what is
//! new, skip what is already recorded, and commit or roll back as a unit.

pub mod engine;
pub mod error;

pub use engine::{AppliedScript, Migrator, MigratorOptions, RunPhase, RunSummary};
pub use error::{MigrateError, MigrateResult};
