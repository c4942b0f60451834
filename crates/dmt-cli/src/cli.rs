//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};
use dmt_core::ScriptOrdering;

/// dmt - versioned, forward-only SQL migrations for DuckDB
#[derive(Parser, Debug)]
#[command(name = "dmt")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to dmt.yml (default: ./dmt.yml if present)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// DuckDB database file, or :memory:
    #[arg(long, global = true, env = "DMT_DATABASE")]
    pub database: Option<String>,

    /// Identity recorded as installed_by
    #[arg(short, long, global = true, env = "DMT_USER")]
    pub username: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the migration history and lock tables
    Init,

    /// Apply all pending migrations in one transaction
    Migrate(MigrateArgs),

    /// Show applied migrations
    History(HistoryArgs),
}

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Directory containing V<n>__<description>.sql scripts
    #[arg(short, long)]
    pub directory: Option<String>,

    /// Total lock acquisition attempts before giving up
    #[arg(long)]
    pub max_lock_attempts: Option<u32>,

    /// Delay between lock attempts in milliseconds
    #[arg(long)]
    pub lock_retry_ms: Option<u64>,

    /// Script ordering within the directory
    #[arg(long, value_enum)]
    pub ordering: Option<OrderingArg>,
}

/// Script ordering choices
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderingArg {
    /// Plain file name order (V10 sorts before V2)
    Lexicographic,
    /// Parsed version order
    Numeric,
}

impl From<OrderingArg> for ScriptOrdering {
    fn from(arg: OrderingArg) -> Self {
        match arg {
            OrderingArg::Lexicographic => ScriptOrdering::Lexicographic,
            OrderingArg::Numeric => ScriptOrdering::Numeric,
        }
    }
}

/// Arguments for the history command
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: HistoryOutput,
}

/// History output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryOutput {
    /// Aligned text table
    Table,
    /// JSON array of records
    Json,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
