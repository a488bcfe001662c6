//! CLI argument parsing for muster.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};

/// Muster: orchestrator for long-running agent CLI executions.
///
/// Executions are durable records on the filesystem: created by the
/// CLI, driven to completion by a detached runner process, and
/// inspected at any time afterwards.
#[derive(Parser, Debug)]
#[command(name = "muster")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

/// Available commands for muster.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execution commands.
    ///
    /// Create, list, and inspect agent executions.
    Execution(ExecutionCommand),

    /// Agent commands.
    ///
    /// Inspect agent definitions and probe the installed agent CLIs.
    Agent(AgentCommand),

    /// Serve the command surface over stdin/stdout.
    ///
    /// Reads newline-delimited JSON requests from stdin and writes one
    /// JSON response line per request.
    Serve,
}

/// Execution subcommands.
#[derive(Parser, Debug)]
pub struct ExecutionCommand {
    #[command(subcommand)]
    pub action: ExecutionAction,
}

#[derive(Subcommand, Debug)]
pub enum ExecutionAction {
    /// Create a new execution and start its runner.
    ///
    /// Snapshots the agent's config into the execution, then spawns a
    /// detached runner to drive it. Prints the new execution id.
    Create(ExecutionCreateArgs),

    /// List all executions with their statuses.
    List,

    /// Show one execution: status, input, and result when present.
    Show(ExecutionShowArgs),
}

/// Arguments for the `execution create` command.
#[derive(Parser, Debug)]
pub struct ExecutionCreateArgs {
    /// Agent to execute, by its configured identifier.
    #[arg(long)]
    pub agent: String,

    /// Prompt text for the agent.
    #[arg(long)]
    pub prompt: String,

    /// Model override passed to the agent CLI.
    #[arg(long)]
    pub model: Option<String>,

    /// Conversation to resume instead of starting a fresh session.
    #[arg(long)]
    pub conversation: Option<String>,

    /// Working directory for the agent subprocess.
    #[arg(long)]
    pub workdir: Option<String>,

    /// Run the execution in this process instead of spawning a
    /// detached runner.
    #[arg(long)]
    pub no_detach: bool,
}

/// Arguments for the `execution show` command.
#[derive(Parser, Debug)]
pub struct ExecutionShowArgs {
    /// Execution id to show.
    pub execution_id: String,
}

/// Agent subcommands.
#[derive(Parser, Debug)]
pub struct AgentCommand {
    #[command(subcommand)]
    pub action: AgentAction,
}

#[derive(Subcommand, Debug)]
pub enum AgentAction {
    /// List all defined agents.
    List,

    /// Show one agent definition.
    Show(AgentShowArgs),

    /// Probe the installed agent CLIs.
    ///
    /// Reports, per runtime kind, whether its executable is present
    /// and which version responds.
    Discovery,
}

/// Arguments for the `agent show` command.
#[derive(Parser, Debug)]
pub struct AgentShowArgs {
    /// Agent id to show.
    pub agent_id: String,
}
