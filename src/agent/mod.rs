//! Core data model for agent executions.
//!
//! An *execution* is one persisted, uniquely-identified request to run an
//! agent: its input, lifecycle status, and eventual result. Identifiers
//! are validated before any filesystem use since they become directory
//! and file names in the store.

use crate::error::{MusterError, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::runtime::RuntimeKind;

/// Identifier of one execution. Generated at creation time, immutable,
/// and used as the execution's directory name in the store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(String);

fn execution_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
            .expect("execution id pattern is valid")
    })
}

impl ExecutionId {
    /// Generate a fresh, globally unique identifier.
    ///
    /// UUIDv7 is time-ordered, so a sorted directory listing of the
    /// store root lists executions in creation order.
    pub fn generate() -> Self {
        ExecutionId(uuid::Uuid::now_v7().to_string())
    }

    /// Parse and validate an identifier from its string form.
    pub fn parse(value: &str) -> Result<Self> {
        let id = ExecutionId(value.to_string());
        id.validate()?;
        Ok(id)
    }

    /// Validate the identifier against the safe-path character set.
    pub fn validate(&self) -> Result<()> {
        if !execution_id_pattern().is_match(&self.0) {
            return Err(MusterError::InvalidExecutionId(self.0.clone()));
        }
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable identifier of an agent definition (e.g. `codex`, `claude-code`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

fn agent_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("agent id pattern is valid")
    })
}

impl AgentId {
    /// Parse and validate an identifier from its string form.
    pub fn parse(value: &str) -> Result<Self> {
        let id = AgentId(value.to_string());
        id.validate()?;
        Ok(id)
    }

    /// Validate the identifier: lowercase alphanumeric segments joined
    /// by single dashes.
    pub fn validate(&self) -> Result<()> {
        if !agent_id_pattern().is_match(&self.0) {
            return Err(MusterError::InvalidAgentId(self.0.clone()));
        }
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a resumable multi-turn session some agents maintain
/// across executions. Opaque to muster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub String);

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The request payload of an execution. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionInput {
    /// Prompt text fed to the agent's standard input.
    pub prompt: String,

    /// Model override passed to the agent CLI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// When set, the runtime resumes this session instead of starting
    /// a fresh one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,

    /// Working directory for the agent subprocess. Defaults to the
    /// runner's current directory when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
}

impl ExecutionInput {
    /// Validate the input. Fails closed before any I/O.
    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(MusterError::InvalidInput("prompt must not be empty".into()));
        }
        Ok(())
    }
}

/// Lifecycle state of an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    Created,
    Running,
    Succeeded,
    Failed,
}

impl ExecutionState {
    /// Whether this state permits no further mutation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionState::Succeeded | ExecutionState::Failed)
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecutionState::Created => "created",
            ExecutionState::Running => "running",
            ExecutionState::Succeeded => "succeeded",
            ExecutionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Lifecycle status of an execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStatus {
    pub state: ExecutionState,

    pub created_at: DateTime<Utc>,

    /// Advanced on every status write.
    pub updated_at: DateTime<Utc>,

    /// Set only when the state is terminal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    /// Number of runner attempts. Retry orchestration is out of scope;
    /// the counter exists for inspection.
    pub attempts: u32,
}

impl ExecutionStatus {
    /// Initial status for a freshly created execution.
    pub fn created(now: DateTime<Utc>) -> Self {
        ExecutionStatus {
            state: ExecutionState::Created,
            created_at: now,
            updated_at: now,
            finished_at: None,
            attempts: 0,
        }
    }
}

/// The persisted outcome of a succeeded execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// Session identifier for resuming the conversation, when the
    /// runtime reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,

    /// The agent's final response text.
    pub response: String,
}

/// Per-agent configuration: which runtime kind handles its executions,
/// plus that kind's option bag. Stored per agent definition, and
/// snapshotted into each execution at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    pub runtime_kind: RuntimeKind,

    /// Open, per-kind option bag. Normalized into the kind's typed
    /// config at the runtime boundary.
    #[serde(default)]
    pub runtime_config: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_execution_ids_are_unique_and_valid() {
        let a = ExecutionId::generate();
        let b = ExecutionId::generate();
        assert_ne!(a, b);
        a.validate().unwrap();
        b.validate().unwrap();
    }

    #[test]
    fn execution_id_rejects_path_hostile_values() {
        for value in ["", "..", "a/b", "../../etc", "ABCDEF", "not a uuid"] {
            assert!(
                ExecutionId::parse(value).is_err(),
                "expected '{}' to be rejected",
                value
            );
        }
    }

    #[test]
    fn execution_id_round_trips_through_parse() {
        let id = ExecutionId::generate();
        let parsed = ExecutionId::parse(id.as_str()).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn agent_id_validation() {
        for valid in ["codex", "claude-code", "codex-2"] {
            assert!(AgentId::parse(valid).is_ok(), "expected '{}' valid", valid);
        }
        for invalid in ["", "-codex", "codex-", "Codex", "claude_code", "codex--v2"] {
            assert!(
                matches!(
                    AgentId::parse(invalid),
                    Err(MusterError::InvalidAgentId(_))
                ),
                "expected '{}' invalid",
                invalid
            );
        }
    }

    #[test]
    fn input_rejects_blank_prompt() {
        let input = ExecutionInput {
            prompt: "   ".into(),
            model: None,
            conversation_id: None,
            working_directory: None,
        };
        assert!(matches!(
            input.validate(),
            Err(MusterError::InvalidInput(_))
        ));
    }

    #[test]
    fn input_serializes_with_camel_case_keys() {
        let input = ExecutionInput {
            prompt: "hello".into(),
            model: Some("gpt-5".into()),
            conversation_id: Some(ConversationId("conv-1".into())),
            working_directory: None,
        };
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["prompt"], "hello");
        assert_eq!(json["model"], "gpt-5");
        assert_eq!(json["conversationId"], "conv-1");
        assert!(json.get("workingDirectory").is_none());
    }

    #[test]
    fn status_round_trips_through_json() {
        let status = ExecutionStatus::created(Utc::now());
        let json = serde_json::to_string(&status).unwrap();
        let loaded: ExecutionStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, status);
    }

    #[test]
    fn state_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(ExecutionState::Created).unwrap(),
            serde_json::json!("created")
        );
        assert_eq!(
            serde_json::to_value(ExecutionState::Succeeded).unwrap(),
            serde_json::json!("succeeded")
        );
    }

    #[test]
    fn terminal_states() {
        assert!(!ExecutionState::Created.is_terminal());
        assert!(!ExecutionState::Running.is_terminal());
        assert!(ExecutionState::Succeeded.is_terminal());
        assert!(ExecutionState::Failed.is_terminal());
    }
}
