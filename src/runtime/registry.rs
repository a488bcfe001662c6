//! Registry of the available runtime integrations.

use crate::error::{MusterError, Result};
use crate::runtime::claude::ClaudeRuntime;
use crate::runtime::codex::CodexRuntime;
use crate::runtime::gemini::GeminiRuntime;
use crate::runtime::{Runtime, RuntimeKind};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Holds one [`Runtime`] per supported kind. Built explicitly and
/// passed where needed; there is no global registry.
pub struct RuntimeRegistry {
    runtimes: BTreeMap<RuntimeKind, Box<dyn Runtime>>,
}

impl RuntimeRegistry {
    /// Build the registry with every supported kind registered.
    ///
    /// `log_root` is where executing runtimes write their per-session
    /// I/O logs.
    pub fn new(log_root: PathBuf) -> Self {
        let mut runtimes: BTreeMap<RuntimeKind, Box<dyn Runtime>> = BTreeMap::new();
        runtimes.insert(RuntimeKind::Claude, Box::new(ClaudeRuntime));
        runtimes.insert(RuntimeKind::Codex, Box::new(CodexRuntime::new(log_root)));
        runtimes.insert(RuntimeKind::Gemini, Box::new(GeminiRuntime));
        RuntimeRegistry { runtimes }
    }

    pub fn get(&self, kind: RuntimeKind) -> Result<&dyn Runtime> {
        self.runtimes
            .get(&kind)
            .map(|runtime| runtime.as_ref())
            .ok_or_else(|| MusterError::RuntimeNotFound(kind.to_string()))
    }

    /// Registered kinds in sorted order.
    pub fn list(&self) -> Vec<RuntimeKind> {
        self.runtimes.keys().copied().collect()
    }
}
