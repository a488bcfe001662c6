//! Gemini agent integration.
//!
//! Discovery and version probing are implemented; execution is not yet.

use crate::agent::{ExecutionId, ExecutionInput};
use crate::cancel::CancelToken;
use crate::error::{MusterError, Result};
use crate::runtime::probe;
use crate::runtime::{Runtime, RuntimeInfo, RuntimeInstance, RuntimeKind};

const GEMINI_EXECUTABLE: &str = "gemini";

pub struct GeminiRuntime;

impl Runtime for GeminiRuntime {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::Gemini
    }

    fn discovery(&self, cancel: &CancelToken) -> Result<bool> {
        probe::discover(cancel, GEMINI_EXECUTABLE)
    }

    fn get_info(&self, cancel: &CancelToken) -> Result<RuntimeInfo> {
        probe::probe_version(cancel, GEMINI_EXECUTABLE)
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
