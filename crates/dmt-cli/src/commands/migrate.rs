//! Migrate command implementation - one all-or-nothing run over the scripts

use anyhow::Result;
use dmt_migrate::{MigratorOptions, RunSummary};
use std::time::Duration;

use crate::cli::{GlobalArgs, MigrateArgs};
use crate::commands::common::{fail, CommandContext};
use crate::interrupt::cancel_on_interrupt;

/// Execute the migrate command
pub(crate) fn execute(args: &MigrateArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = CommandContext::load(global)?;
    let options = build_options(&ctx, args);
    let dir = ctx.migrations_dir(args.directory.as_deref());

    log::debug!(
        "Migrating {} from {} ({} ordering, {} lock attempts every {} ms)",
        ctx.database,
        dir.display(),
        options.ordering,
        options.retry.max_attempts,
        options.retry.interval.as_millis()
    );

    let summary = ctx
        .open_migrator(options, cancel_on_interrupt())
        .and_then(|migrator| {
            migrator.init()?;
            migrator.run(&dir)
        })
        .map_err(|e| fail("Migration", &e))?;

    print_summary(&summary);
    Ok(())
}

/// Config-derived options with command-line overrides applied
fn build_options(ctx: &CommandContext, args: &MigrateArgs) -> MigratorOptions {
    let mut options = ctx.options();
    if let Some(ordering) = args.ordering {
        options.ordering = ordering.into();
    }
    if let Some(attempts) = args.max_lock_attempts {
        options.retry.max_attempts = attempts.max(1);
    }
    if let Some(ms) = args.lock_retry_ms {
        options.retry.interval = Duration::from_millis(ms);
    }
    options
}

fn print_summary(summary: &RunSummary) {
    if summary.is_up_to_date() {
        println!(
            "Database is up to date ({} migrations already applied)",
            summary.skipped.len()
        );
        return;
    }
    for applied in &summary.applied {
        println!(
            "  Applied {} [{} ms]",
            applied.file_name, applied.execution_time_ms
        );
    }
    println!(
        "\n{} applied, {} already up to date",
        summary.applied.len(),
        summary.skipped.len()
    );
}
