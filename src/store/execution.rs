//! The execution store.
//!
//! Layout under the store root:
//!
//! ```text
//! <root>/<execution-id>/input.json   written once at creation
//! <root>/<execution-id>/agent.json   config snapshot, written once
//! <root>/<execution-id>/status.json  rewritten on every transition
//! <root>/<execution-id>/result.json  written once on success
//! ```
//!
//! Creation is not transactional: a crash mid-create can leave a
//! partial directory. Readers treat an execution without a readable
//! status as unparsable and skip it, so a partial directory is inert
//! rather than harmful.

use crate::agent::{
    AgentConfig, ExecutionId, ExecutionInput, ExecutionResult, ExecutionState, ExecutionStatus,
};
use crate::error::{MusterError, Result};
use crate::fs::{atomic_write_json, read_json};
use chrono::Utc;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

const INPUT_FILE: &str = "input.json";
const AGENT_CONFIG_FILE: &str = "agent.json";
const STATUS_FILE: &str = "status.json";
const RESULT_FILE: &str = "result.json";

/// Repository of executions rooted at one directory.
pub struct ExecutionRepository {
    root: PathBuf,
}

impl ExecutionRepository {
    /// Open a repository at the given root. No I/O happens here; the
    /// root materializes on the first create.
    pub fn open(root: PathBuf) -> Self {
        ExecutionRepository { root }
    }

    /// Create a new execution from its input and the agent config
    /// snapshot taken at creation time.
    ///
    /// The input is validated before anything touches disk.
    pub fn create(
        &self,
        input: &ExecutionInput,
        agent_config: &AgentConfig,
    ) -> Result<Execution> {
        input.validate()?;

        let id = ExecutionId::generate();
        let dir = self.root.join(id.as_str());
        fs::create_dir_all(&dir).map_err(|e| {
            MusterError::io(format!("create execution dir '{}'", dir.display()), e)
        })?;

        atomic_write_json(&dir.join(INPUT_FILE), input)?;
        atomic_write_json(&dir.join(AGENT_CONFIG_FILE), agent_config)?;
        atomic_write_json(&dir.join(STATUS_FILE), &ExecutionStatus::created(Utc::now()))?;

        debug!(execution = %id, "created execution");
        Ok(Execution { id, dir })
    }

    /// Whether an execution directory exists for the identifier.
    pub fn exists(&self, id: &ExecutionId) -> bool {
        id.validate().is_ok() && self.root.join(id.as_str()).is_dir()
    }

    /// Look up one execution.
    pub fn get(&self, id: &ExecutionId) -> Result<Execution> {
        id.validate()?;
        let dir = self.root.join(id.as_str());
        if !dir.is_dir() {
            return Err(MusterError::ExecutionNotFound(id.to_string()));
        }
        Ok(Execution {
            id: id.clone(),
            dir,
        })
    }

    /// All execution identifiers, sorted ascending.
    ///
    /// Identifiers are time-ordered, so this is creation order. Entries
    /// whose names are not valid identifiers are skipped. A root that
    /// does not exist yet reads as empty.
    pub fn find(&self) -> Result<Vec<ExecutionId>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(MusterError::io(
                    format!("list executions in '{}'", self.root.display()),
                    e,
                ));
            }
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                MusterError::io(
                    format!("list executions in '{}'", self.root.display()),
                    e,
                )
            })?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            match ExecutionId::parse(name) {
                Ok(id) => ids.push(id),
                Err(_) => {
                    debug!(entry = name, "skipping foreign entry in execution store");
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// Handle to one stored execution.
#[derive(Debug)]
pub struct Execution {
    id: ExecutionId,
    dir: PathBuf,
}

impl Execution {
    pub fn id(&self) -> &ExecutionId {
        &self.id
    }

    pub fn get_input(&self) -> Result<ExecutionInput> {
        read_json(&self.dir.join(INPUT_FILE))
    }

    /// The agent config snapshot taken at creation time.
    pub fn get_agent_config(&self) -> Result<AgentConfig> {
        match read_json(&self.dir.join(AGENT_CONFIG_FILE)) {
            Err(MusterError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                Err(MusterError::ExecutionAgentConfigNotFound(self.id.to_string()))
            }
            other => other,
        }
    }

    pub fn get_status(&self) -> Result<ExecutionStatus> {
        match read_json(&self.dir.join(STATUS_FILE)) {
            Err(MusterError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                Err(MusterError::ExecutionNotFound(self.id.to_string()))
            }
            other => other,
        }
    }

    /// Persist a status transition. `updated_at` is stamped here so
    /// callers mutate only the fields they mean to change.
    pub fn update_status(&self, mut status: ExecutionStatus) -> Result<ExecutionStatus> {
        status.updated_at = Utc::now();
        atomic_write_json(&self.dir.join(STATUS_FILE), &status)?;
        Ok(status)
    }

    pub fn has_result(&self) -> bool {
        self.dir.join(RESULT_FILE).is_file()
    }

    /// The persisted result. Its absence is the expected
    /// [`MusterError::ResultNotAvailable`] condition, not a failure.
    pub fn get_result(&self) -> Result<ExecutionResult> {
        match read_json(&self.dir.join(RESULT_FILE)) {
            Err(MusterError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                Err(MusterError::ResultNotAvailable(self.id.to_string()))
            }
            other => other,
        }
    }

    /// Persist the result, then mark the execution succeeded.
    ///
    /// The result file is written first. A crash between the two writes
    /// leaves a running status next to a present result, which readers
    /// resolve in favor of the result.
    pub fn set_result(&self, result: &ExecutionResult) -> Result<()> {
        atomic_write_json(&self.dir.join(RESULT_FILE), result)?;

        let mut status = self.get_status()?;
        status.state = ExecutionState::Succeeded;
        status.finished_at = Some(Utc::now());
        self.update_status(status)?;
        Ok(())
    }
}
