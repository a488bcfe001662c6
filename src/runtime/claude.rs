//! Claude agent integration.
//!
//! Discovery and version probing are implemented; execution is not yet.

use crate::agent::{ExecutionId, ExecutionInput};
use crate::cancel::CancelToken;
use crate::error::{MusterError, Result};
use crate::runtime::probe;
use crate::runtime::{Runtime, RuntimeInfo, RuntimeInstance, RuntimeKind};

const CLAUDE_EXECUTABLE: &str = "claude";

pub struct ClaudeRuntime;

impl Runtime for ClaudeRuntime {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::Claude
    }

    fn discovery(&self, cancel: &CancelToken) -> Result<bool> {
        probe::discover(cancel, CLAUDE_EXECUTABLE)
    }

    fn get_info(&self, cancel: &CancelToken) -> Result<RuntimeInfo> {
        probe::probe_version(cancel, CLAUDE_EXECUTABLE)
    }

    fn default_config(&self) -> Result<serde_json::Value> {
        Err(MusterError::UnsupportedRuntime(
            self.kind().to_string(),
            "default config".to_string(),
        ))
    }

    fn execute(
        &self,
        _cancel: &CancelToken,
        _id: &ExecutionId,
        _config: &serde_json::Value,
        _input: &ExecutionInput,
    ) -> Result<Box<dyn RuntimeInstance>> {
        Err(MusterError::UnsupportedRuntime(
            self.kind().to_string(),
            "execution".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_is_unsupported() {
        let runtime = ClaudeRuntime;
        let input = ExecutionInput {
            prompt: "hello".into(),
            model: None,
            conversation_id: None,
            working_directory: None,
        };

        let result = runtime.execute(
            &CancelToken::new(),
            &ExecutionId::generate(),
            &serde_json::Value::Null,
            &input,
        );
        match result {
            Err(MusterError::UnsupportedRuntime(_, _)) => {}
            Err(other) => panic!("expected UnsupportedRuntime, got {:?}", other),
            Ok(_) => panic!("expected UnsupportedRuntime, got a running instance"),
        }
    }
}
