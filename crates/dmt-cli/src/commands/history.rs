//! History command implementation - prints the applied-migration log

use anyhow::{Context, Result};
use dmt_core::MigrationRecord;

use crate::cli::{GlobalArgs, HistoryArgs, HistoryOutput};
use crate::commands::common::{fail, CommandContext};
use crate::interrupt::cancel_on_interrupt;

/// Execute the history command
pub(crate) fn execute(args: &HistoryArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = CommandContext::load(global)?;
    let records = ctx
        .open_migrator(ctx.options(), cancel_on_interrupt())
        .and_then(|migrator| migrator.history())
        .map_err(|e| fail("Reading migration history", &e))?;

    match args.output {
        HistoryOutput::Json => {
            let json = serde_json::to_string_pretty(&records)
                .context("Failed to serialize migration history")?;
            println!("{json}");
        }
        HistoryOutput::Table => print_table(&records),
    }
    Ok(())
}

const HEADERS: [&str; 6] = [
    "VERSION",
    "DESCRIPTION",
    "CHECKSUM",
    "INSTALLED BY",
    "EXECUTED AT",
    "TIME (ms)",
];

fn print_table(records: &[MigrationRecord]) {
    if records.is_empty() {
        println!("No migrations applied yet.");
        return;
    }

    let rows: Vec<[String; 6]> = records.iter().map(table_row).collect();
    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    print_line(&HEADERS.map(str::to_string), &widths);
    let rule = widths.map(|w| "-".repeat(w));
    print_line(&rule, &widths);
    for row in &rows {
        print_line(row, &widths);
    }
}

fn table_row(record: &MigrationRecord) -> [String; 6] {
    [
        record.version.clone(),
        record.description.clone().unwrap_or_default(),
        record.checksum.to_string(),
        record.installed_by.clone(),
        record
            .executed_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default(),
        record
            .execution_time_ms
            .map(|ms| ms.to_string())
            .unwrap_or_default(),
    ]
}

fn print_line(cells: &[String; 6], widths: &[usize; 6]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    println!("{}", line.trim_end());
}
