//! Main entry point for the `muster` CLI. It parses arguments,
//! dispatches to the appropriate command handler, and handles errors
//! with proper exit codes.

use muster::cli::Cli;
use muster::{commands, exit_codes, logging};
use std::process::ExitCode;

fn main() -> ExitCode {
    logging::init("muster=warn");

    let cli = Cli::parse_args();

    match commands::dispatch(cli.command) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            ExitCode::from(err.exit_code() as u8)
        }
    }
}
