//! Agent runtime abstraction.
//!
//! A [`Runtime`] is the integration for one agent kind: it knows how to
//! discover and describe the agent's CLI and how to turn a generic
//! execution request into a concrete subprocess invocation. A
//! [`RuntimeInstance`] is one live subprocess plus its advisory event
//! stream and terminal result.
//!
//! Kinds differ only in the CLI flags derived from config, how session
//! resumption is expressed, and the shape of their event stream. Codex
//! is fully implemented; gemini and claude ship as discovery/version
//! stubs, which is a supported extension point rather than a defect.

use crate::agent::{ConversationId, ExecutionId, ExecutionInput};
use crate::cancel::CancelToken;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::mpsc::Receiver;

pub mod claude;
pub mod codex;
pub mod gemini;
mod probe;
mod registry;

pub use registry::RuntimeRegistry;

/// The set of supported agent integrations.
///
/// Variants are declared in lexicographic order so the derived `Ord`
/// matches the sorted order `RuntimeRegistry::list` promises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    Claude,
    Codex,
    Gemini,
}

impl RuntimeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeKind::Claude => "claude",
            RuntimeKind::Codex => "codex",
            RuntimeKind::Gemini => "gemini",
        }
    }
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuntimeKind {
    type Err = crate::error::MusterError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "claude" => Ok(RuntimeKind::Claude),
            "codex" => Ok(RuntimeKind::Codex),
            "gemini" => Ok(RuntimeKind::Gemini),
            other => Err(crate::error::MusterError::RuntimeNotFound(other.to_string())),
        }
    }
}

/// Version metadata for an installed agent CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeInfo {
    pub version: String,
}

/// An advisory progress notification emitted during a live run.
///
/// Events are observability, not the result channel: delivery is
/// best-effort over a small bounded channel and an event may be dropped
/// when the consumer falls behind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuntimeEvent {
    Started { timestamp: DateTime<Utc> },
    Finished { timestamp: DateTime<Utc> },
}

impl RuntimeEvent {
    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            RuntimeEvent::Started { .. } => "started",
            RuntimeEvent::Finished { .. } => "finished",
        }
    }
}

/// The authoritative outcome of a completed instance, copied into the
/// persisted [`crate::agent::ExecutionResult`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuntimeResult {
    pub conversation_id: Option<ConversationId>,
    pub response: String,
}

/// The integration for one agent kind.
pub trait Runtime: Send + Sync {
    /// The kind this runtime handles.
    fn kind(&self) -> RuntimeKind;

    /// True iff the agent's executable is resolvable. A lookup failure
    /// of the "not found" class is `Ok(false)`, not an error.
    fn discovery(&self, cancel: &CancelToken) -> Result<bool>;

    /// Invoke the agent's version flag and extract its version.
    fn get_info(&self, cancel: &CancelToken) -> Result<RuntimeInfo>;

    /// The kind's default option set, as the open config shape.
    fn default_config(&self) -> Result<serde_json::Value>;

    /// Start exactly one subprocess for the execution.
    ///
    /// Normalizes the open `config` value into the kind's typed config,
    /// fills kind defaults, resolves the executable, and spawns. The
    /// token governs the subprocess lifetime; cancellation is checked
    /// before spawning.
    fn execute(
        &self,
        cancel: &CancelToken,
        id: &ExecutionId,
        config: &serde_json::Value,
        input: &ExecutionInput,
    ) -> Result<Box<dyn RuntimeInstance>>;
}

/// One live subprocess for a single execution attempt.
pub trait RuntimeInstance: Send {
    /// Take the advisory event stream. Returns `None` after the first
    /// call; there is exactly one consumer.
    fn take_events(&mut self) -> Option<Receiver<RuntimeEvent>>;

    /// Block until the run loop completes or the token is cancelled.
    ///
    /// On cancellation this returns `MusterError::Cancelled` without
    /// stopping the background run loop; only the token supplied to
    /// [`Runtime::execute`] terminates the subprocess itself.
    fn wait(self: Box<Self>, cancel: &CancelToken) -> Result<RuntimeResult>;
}
