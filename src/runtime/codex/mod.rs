//! Codex agent integration.

mod config;
mod instance;

pub use config::CodexConfig;

use crate::agent::{ExecutionId, ExecutionInput};
use crate::cancel::CancelToken;
use crate::error::{MusterError, Result};
use crate::process::lookup_executable;
use crate::runtime::probe;
use crate::runtime::{Runtime, RuntimeInfo, RuntimeInstance, RuntimeKind};
use instance::CodexInstance;
use std::path::PathBuf;
use tracing::debug;

const CODEX_EXECUTABLE: &str = "codex";

pub struct CodexRuntime {
    log_root: PathBuf,
}

impl CodexRuntime {
    /// `log_root` is the directory under which per-session I/O logs are
    /// written.
    pub fn new(log_root: PathBuf) -> Self {
        CodexRuntime { log_root }
    }
}

impl Runtime for CodexRuntime {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::Codex
    }

    fn discovery(&self, cancel: &CancelToken) -> Result<bool> {
        probe::discover(cancel, CODEX_EXECUTABLE)
    }

    fn get_info(&self, cancel: &CancelToken) -> Result<RuntimeInfo> {
        probe::probe_version(cancel, CODEX_EXECUTABLE)
    }

    fn default_config(&self) -> Result<serde_json::Value> {
        serde_json::to_value(CodexConfig::default())
            .map_err(|e| MusterError::serde("serialize codex default config", e))
    }

    fn execute(
        &self,
        cancel: &CancelToken,
        id: &ExecutionId,
        config: &serde_json::Value,
        input: &ExecutionInput,
    ) -> Result<Box<dyn RuntimeInstance>> {
        cancel.check()?;
        input.validate()?;

        let config = CodexConfig::from_value(config)?;
        let executable = lookup_executable(cancel, &[CODEX_EXECUTABLE])?;
        debug!(
            execution = %id,
            executable = %executable.display(),
            "starting codex execution"
        );

        let instance =
            CodexInstance::spawn(cancel, &executable, id, &self.log_root, &config, input)?;
        Ok(Box::new(instance))
    }
}
