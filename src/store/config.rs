//! The agent config store: one YAML file per agent definition.

use crate::agent::{AgentConfig, AgentId};
use crate::error::{MusterError, Result};
use crate::fs::{atomic_write_yaml, read_yaml};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

const CONFIG_EXTENSION: &str = "yaml";

/// Repository of agent definitions rooted at one directory.
pub struct ConfigRepository {
    root: PathBuf,
}

impl ConfigRepository {
    /// Open a repository at the given root. No I/O happens here.
    pub fn open(root: PathBuf) -> Self {
        ConfigRepository { root }
    }

    fn path_for(&self, id: &AgentId) -> PathBuf {
        self.root.join(format!("{}.{}", id, CONFIG_EXTENSION))
    }

    pub fn get(&self, id: &AgentId) -> Result<AgentConfig> {
        id.validate()?;
        match read_yaml(&self.path_for(id)) {
            Err(MusterError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                Err(MusterError::AgentConfigNotFound(id.to_string()))
            }
            other => other,
        }
    }

    pub fn set(&self, id: &AgentId, config: &AgentConfig) -> Result<()> {
        id.validate()?;
        fs::create_dir_all(&self.root).map_err(|e| {
            MusterError::io(format!("create config dir '{}'", self.root.display()), e)
        })?;
        atomic_write_yaml(&self.path_for(id), config)
    }

    /// All defined agent identifiers, sorted. Files without the config
    /// extension or with invalid names are skipped. A root that does
    /// not exist yet reads as empty.
    pub fn list(&self) -> Result<Vec<AgentId>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(MusterError::io(
                    format!("list agent configs in '{}'", self.root.display()),
                    e,
                ));
            }
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                MusterError::io(
                    format!("list agent configs in '{}'", self.root.display()),
                    e,
                )
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(CONFIG_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match AgentId::parse(stem) {
                Ok(id) => ids.push(id),
                Err(_) => {
                    debug!(entry = stem, "skipping foreign entry in agent config store");
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RuntimeKind;
    use tempfile::TempDir;

    fn config() -> AgentConfig {
        AgentConfig {
            runtime_kind: RuntimeKind::Codex,
            runtime_config: serde_json::json!({"requireWorkspaceRepository": false}),
        }
    }

    fn repository() -> (TempDir, ConfigRepository) {
        let temp = TempDir::new().unwrap();
        let repo = ConfigRepository::open(temp.path().join("agents"));
        (temp, repo)
    }

    #[test]
    fn set_then_get_round_trips() {
        let (_temp, repo) = repository();
        let id = AgentId::parse("codex").unwrap();

        repo.set(&id, &config()).unwrap();
        let loaded = repo.get(&id).unwrap();

        assert_eq!(loaded, config());
    }

    #[test]
    fn get_unknown_agent_is_not_found() {
        let (_temp, repo) = repository();
        let id = AgentId::parse("missing").unwrap();

        let err = repo.get(&id).unwrap_err();
        assert!(matches!(err, MusterError::AgentConfigNotFound(_)));
        assert!(err.is_not_found());
    }

    #[test]
    fn list_on_missing_root_is_empty() {
        let (_temp, repo) = repository();
        assert!(repo.list().unwrap().is_empty());
    }

    #[test]
    fn list_is_sorted_and_skips_foreign_files() {
        let (temp, repo) = repository();
        repo.set(&AgentId::parse("gemini").unwrap(), &config())
            .unwrap();
        repo.set(&AgentId::parse("codex").unwrap(), &config())
            .unwrap();
        fs::write(temp.path().join("agents/README.md"), "notes").unwrap();
        fs::write(temp.path().join("agents/Bad_Name.yaml"), "{}").unwrap();

        let ids = repo.list().unwrap();

        assert_eq!(
            ids,
            vec![
                AgentId::parse("codex").unwrap(),
                AgentId::parse("gemini").unwrap()
            ]
        );
    }
}
