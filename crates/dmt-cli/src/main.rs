//! dmt CLI - versioned SQL migrations for DuckDB

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod interrupt;

use cli::Cli;
use commands::common::ExitCode;
use commands::{history, init, migrate};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    if let Err(err) = dispatch(&cli) {
        let code = match err.downcast_ref::<ExitCode>() {
            Some(exit) => exit.0,
            None => {
                eprintln!("Error: {err:#}");
                1
            }
        };
        std::process::exit(code);
    }
}

fn dispatch(cli: &Cli) -> Result<()> {
    match &cli.command {
        cli::Commands::Init => init::execute(&cli.global),
        cli::Commands::Migrate(args) => migrate::execute(args, &cli.global),
        cli::Commands::History(args) => history::execute(args, &cli.global),
    }
}

/// `info` by default, `debug` with `--verbose`; `RUST_LOG` wins over both.
fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_secs()
        .format_target(false)
        .init();
}
