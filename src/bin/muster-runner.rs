//! The detached runner: drives exactly one execution to a terminal
//! state. Spawned by `muster execution create` (and the serve
//! front-end) so the execution outlives the process that requested it.

use clap::Parser;
use muster::agent::ExecutionId;
use muster::cancel::CancelToken;
use muster::error::Result;
use muster::runner::run_execution;
use muster::runtime::RuntimeRegistry;
use muster::store::ExecutionRepository;
use muster::{dirs, exit_codes, logging};
use std::process::ExitCode;

/// Run one muster execution to completion.
#[derive(Parser, Debug)]
#[command(name = "muster-runner")]
#[command(author, version, about, long_about = None)]
struct RunnerCli {
    /// Execution id to run.
    execution_id: String,
}

fn main() -> ExitCode {
    logging::init("muster=info");

    let cli = RunnerCli::parse();

    match run(&cli.execution_id) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            eprintln!("Error: {}", err);

            ExitCode::from(err.exit_code() as u8)
        }
    }
}

fn run(execution_id: &str) -> Result<()> {
    let id = ExecutionId::parse(execution_id)?;
    let repository = ExecutionRepository::open(dirs::executions_dir()?);
    let registry = RuntimeRegistry::new(dirs::runtime_log_dir()?);
    run_execution(&repository, &registry, &CancelToken::new(), &id)
}
