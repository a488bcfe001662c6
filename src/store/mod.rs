//! Crash-safe filesystem persistence.
//!
//! Two stores live side by side: the execution store, one directory per
//! execution holding its immutable input, config snapshot, mutable
//! status, and eventual result; and the agent config store, one YAML
//! file per agent definition. All writes go through the atomic helpers
//! in [`crate::fs`], so readers never observe partial files.

mod config;
mod execution;

pub use config::ConfigRepository;
pub use execution::{Execution, ExecutionRepository};
