//! Init command implementation - creates the history and lock tables

use anyhow::Result;

use crate::cli::GlobalArgs;
use crate::commands::common::{fail, CommandContext};
use crate::interrupt::cancel_on_interrupt;

/// Execute the init command
pub(crate) fn execute(global: &GlobalArgs) -> Result<()> {
    let ctx = CommandContext::load(global)?;
    ctx.open_migrator(ctx.options(), cancel_on_interrupt())
        .and_then(|migrator| migrator.init())
        .map_err(|e| fail("Init", &e))?;

    println!("Migration history ready in {}", ctx.database);
    Ok(())
}
