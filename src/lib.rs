//! Muster: orchestrator for long-running agent CLI executions.
//!
//! An execution is a durable filesystem record of one request to run an
//! agent (codex, gemini, claude): its input, lifecycle status, and
//! eventual result. The `muster` CLI creates and inspects executions; a
//! detached `muster-runner` process drives each one to completion
//! through the runtime abstraction in [`runtime`].

pub mod agent;
pub mod cancel;
pub mod cli;
pub mod commands;
pub mod dirs;
pub mod error;
pub mod exit_codes;
pub mod fs;
pub mod logging;
pub mod process;
pub mod runner;
pub mod runtime;
pub mod store;
