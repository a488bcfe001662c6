//! Error types for muster.
//!
//! Uses thiserror for derive macros. Each failure class callers need to
//! branch on gets its own variant: validation failures, the various
//! not-found conditions, I/O wrapped with operation context, event-stream
//! protocol violations, subprocess failures, and cancellation.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for muster operations.
#[derive(Error, Debug)]
pub enum MusterError {
    /// An execution identifier failed safe-path validation.
    #[error("invalid execution id '{0}'")]
    InvalidExecutionId(String),

    /// An agent identifier failed validation.
    #[error("invalid agent id '{0}'")]
    InvalidAgentId(String),

    /// Execution input failed validation before any I/O.
    #[error("invalid execution input: {0}")]
    InvalidInput(String),

    /// No execution directory exists for the identifier.
    #[error("execution '{0}' not found")]
    ExecutionNotFound(String),

    /// The execution directory exists but has no agent config snapshot.
    #[error("execution '{0}' has no agent config")]
    ExecutionAgentConfigNotFound(String),

    /// The execution already reached a terminal state and cannot be
    /// run again.
    #[error("execution '{0}' is already finished")]
    ExecutionFinished(String),

    /// The execution has no result yet. Expected before completion.
    #[error("execution '{0}' has no result")]
    ResultNotAvailable(String),

    /// No agent definition file exists for the identifier.
    #[error("agent config '{0}' not found")]
    AgentConfigNotFound(String),

    /// The runtime kind is not present in the registry.
    #[error("runtime '{0}' not found")]
    RuntimeNotFound(String),

    /// None of the candidate executable names resolved.
    #[error("executable not found: {0}")]
    ExecutableNotFound(String),

    /// The runtime kind does not implement the requested operation.
    #[error("runtime '{0}' does not support {1}")]
    UnsupportedRuntime(String, String),

    /// Filesystem or process I/O failure, wrapped with operation context.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization or deserialization failure.
    #[error("{context}: {message}")]
    Serde { context: String, message: String },

    /// Malformed event-stream JSON. Fatal to the run that produced it.
    #[error("event stream protocol error: {0}")]
    Protocol(String),

    /// The agent subprocess failed. The message is the trimmed stderr
    /// when available, and the exit code is captured when the process
    /// exited rather than being killed.
    #[error("runtime execution failed: {message}")]
    Runtime {
        message: String,
        exit_code: Option<i32>,
    },

    /// The operation was cancelled. Never masked as another error kind.
    #[error("operation cancelled")]
    Cancelled,
}

impl MusterError {
    /// Wrap an I/O error with operation context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        MusterError::Io {
            context: context.into(),
            source,
        }
    }

    /// Wrap a serialization error with operation context.
    pub fn serde(context: impl Into<String>, message: impl ToString) -> Self {
        MusterError::Serde {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// True for the not-found conditions callers treat as absence
    /// rather than failure.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            MusterError::ExecutionNotFound(_)
                | MusterError::ExecutionAgentConfigNotFound(_)
                | MusterError::ResultNotAvailable(_)
                | MusterError::AgentConfigNotFound(_)
                | MusterError::RuntimeNotFound(_)
                | MusterError::ExecutableNotFound(_)
        )
    }

    /// Returns the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            MusterError::InvalidExecutionId(_)
            | MusterError::InvalidAgentId(_)
            | MusterError::InvalidInput(_)
            | MusterError::ExecutionFinished(_)
            | MusterError::UnsupportedRuntime(_, _) => exit_codes::USER_ERROR,
            MusterError::ExecutionNotFound(_)
            | MusterError::ExecutionAgentConfigNotFound(_)
            | MusterError::ResultNotAvailable(_)
            | MusterError::AgentConfigNotFound(_)
            | MusterError::RuntimeNotFound(_)
            | MusterError::ExecutableNotFound(_) => exit_codes::NOT_FOUND,
            MusterError::Protocol(_) | MusterError::Runtime { .. } => exit_codes::RUNTIME_FAILURE,
            MusterError::Io { .. } | MusterError::Serde { .. } => exit_codes::IO_FAILURE,
            MusterError::Cancelled => exit_codes::CANCELLED,
        }
    }
}

/// Result type alias for muster operations.
pub type Result<T> = std::result::Result<T, MusterError>;
