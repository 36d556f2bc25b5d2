//! Command line interface for linux_release_packager.
//!
//! Parses arguments, resolves [`Settings`](crate::bundler::Settings) and
//! dispatches to the `package`, `scaffold` and `inspect` commands.

mod args;
pub mod commands;
mod output;

pub use args::{Args, Command, ProjectArgs, RuntimeConfig};
pub use commands::execute_command;
pub use output::OutputManager;

use crate::error::Result;
use clap::Parser;

/// Main CLI entry point, returning the process exit code.
///
/// Usage errors exit with 1; `--help` and `--version` exit with 0.
pub async fn run() -> Result<i32> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            e.print()?;
            return Ok(code);
        }
    };
    init_logging(&args);
    execute_command(args).await
}

/// `RUST_LOG` applies as usual; `--verbose` lifts this crate to `debug`
/// and `--quiet` lowers the default to `warn`.
fn init_logging(args: &Args) {
    let default = if args.quiet { "warn" } else { "info" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default));
    if args.verbose {
        builder.filter_module(env!("CARGO_CRATE_NAME"), log::LevelFilter::Debug);
    }
    // A logger installed by an embedding program wins.
    let _ = builder.try_init();
}

