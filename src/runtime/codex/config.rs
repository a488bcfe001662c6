//! Typed configuration for the codex runtime.

use crate::error::{MusterError, Result};
use serde::{Deserialize, Serialize};

/// Runtime options for codex execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodexConfig {
    /// Require the working directory to be a git repository. When
    /// disabled, `--skip-git-repo-check` is passed.
    pub require_workspace_repository: bool,

    /// Allow codex to use its internal web-search tool, without
    /// granting general network access.
    pub enable_web_search: Option<bool>,

    /// Allow the sandboxed workspace network access.
    pub enable_network_access: Option<bool>,
}

impl Default for CodexConfig {
    fn default() -> Self {
        CodexConfig {
            require_workspace_repository: true,
            enable_web_search: None,
            enable_network_access: None,
        }
    }
}

impl CodexConfig {
    /// Normalize the open config value into a typed config.
    ///
    /// `null` means "all defaults". Any other shape is structurally
    /// re-decoded, so a generic JSON-shaped config transparently
    /// round-trips into the typed one; unknown keys are ignored and
    /// absent keys take their defaults.
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        if value.is_null() {
            return Ok(CodexConfig::default());
        }

        serde_json::from_value(value.clone())
            .map_err(|e| MusterError::serde("normalize codex config", e))
    }

    /// Render the CLI flags for this config.
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if !self.require_workspace_repository {
            args.push("--skip-git-repo-check".to_string());
        }

        if let Some(enabled) = self.enable_network_access {
            args.push("--config".to_string());
            args.push(format!(
                "sandbox_workspace_write.network_access={}",
                enabled
            ));
        }

        if let Some(enabled) = self.enable_web_search {
            args.push("--config".to_string());
            args.push(format!("features.web_search_request={}", enabled));
        }

        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_config_takes_defaults() {
        let config = CodexConfig::from_value(&serde_json::Value::Null).unwrap();
        assert_eq!(config, CodexConfig::default());
        assert!(config.require_workspace_repository);
    }

    #[test]
    fn structural_config_round_trips_into_typed() {
        let value = json!({
            "requireWorkspaceRepository": false,
            "enableWebSearch": true,
        });

        let config = CodexConfig::from_value(&value).unwrap();

        assert!(!config.require_workspace_repository);
        assert_eq!(config.enable_web_search, Some(true));
        assert_eq!(config.enable_network_access, None);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let value = json!({"futureOption": 7});
        let config = CodexConfig::from_value(&value).unwrap();
        assert_eq!(config, CodexConfig::default());
    }

    #[test]
    fn default_config_renders_no_flags() {
        assert!(CodexConfig::default().args().is_empty());
    }

    #[test]
    fn args_render_each_option() {
        let config = CodexConfig {
            require_workspace_repository: false,
            enable_web_search: Some(false),
            enable_network_access: Some(true),
        };

        assert_eq!(
            config.args(),
            vec![
                "--skip-git-repo-check",
                "--config",
                "sandbox_workspace_write.network_access=true",
                "--config",
                "features.web_search_request=false",
            ]
        );
    }

    #[test]
    fn typed_config_survives_serde_round_trip() {
        let config = CodexConfig {
            require_workspace_repository: false,
            enable_web_search: Some(true),
            enable_network_access: Some(false),
        };
        let value = serde_json::to_value(&config).unwrap();
        let back = CodexConfig::from_value(&value).unwrap();
        assert_eq!(back, config);
    }
}
