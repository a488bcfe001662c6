//! Command implementations for muster.
//!
//! This module provides the dispatcher that routes CLI commands to
//! their implementations. Handlers build their JSON payload through a
//! value-returning core function, so the same logic backs both the CLI
//! and the `serve` front-end.

mod agent;
mod execution;
mod serve;

use crate::cancel::CancelToken;
use crate::cli::{AgentAction, AgentCommand, Command, ExecutionAction, ExecutionCommand};
use crate::dirs;
use crate::error::Result;
use crate::runtime::RuntimeRegistry;
use crate::store::{ConfigRepository, ExecutionRepository};

/// Dispatch a command to its implementation.
pub fn dispatch(command: Command) -> Result<()> {
    let cancel = CancelToken::new();
    let context = CommandContext::from_environment()?;

    match command {
        Command::Execution(ExecutionCommand { action }) => match action {
            ExecutionAction::Create(args) => execution::cmd_create(&context, &cancel, args),
            ExecutionAction::List => execution::cmd_list(&context),
            ExecutionAction::Show(args) => execution::cmd_show(&context, args),
        },
        Command::Agent(AgentCommand { action }) => match action {
            AgentAction::List => agent::cmd_list(&context),
            AgentAction::Show(args) => agent::cmd_show(&context, args),
            AgentAction::Discovery => agent::cmd_discovery(&context, &cancel),
        },
        Command::Serve => serve::cmd_serve(&context, &cancel),
    }
}

/// Shared handles every command needs: the two stores and the runtime
/// registry, resolved from the environment.
pub(crate) struct CommandContext {
    pub executions: ExecutionRepository,
    pub agents: ConfigRepository,
    pub registry: RuntimeRegistry,
}

impl CommandContext {
    pub fn from_environment() -> Result<Self> {
        Ok(CommandContext {
            executions: ExecutionRepository::open(dirs::executions_dir()?),
            agents: ConfigRepository::open(dirs::agents_dir()?),
            registry: RuntimeRegistry::new(dirs::runtime_log_dir()?),
        })
    }
}

/// Print a payload as pretty JSON on stdout.
fn print_json(value: &serde_json::Value) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| crate::error::MusterError::serde("render output", e))?;
    println!("{}", rendered);
    Ok(())
}
