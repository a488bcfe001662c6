//! Detached spawning of the runner process.
//!
//! The runner must outlive the process that requested the execution, so
//! it is started in its own process group with null standard streams and
//! the child handle is released without waiting. After a successful
//! start the spawner has no visibility into the child; its outcome is
//! observed through the execution store.

use crate::agent::ExecutionId;
use crate::cancel::CancelToken;
use crate::error::{MusterError, Result};
use crate::process::lookup_executable;
use std::env;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::debug;

/// Name of the runner binary searched next to the current executable
/// and on PATH.
pub const RUNNER_EXECUTABLE_NAME: &str = "muster-runner";

/// Environment variable overriding the runner executable path.
pub const RUNNER_PATH_ENV: &str = "MUSTER_RUNNER_PATH";

/// Starts the runner for one execution id.
///
/// Behind a trait so command handlers can be tested with a fake that
/// records spawns instead of forking.
pub trait Spawner {
    fn spawn(&self, cancel: &CancelToken, id: &ExecutionId) -> Result<()>;
}

/// Resolve the runner executable using three strategies in priority
/// order: the `MUSTER_RUNNER_PATH` override, a sibling of the current
/// executable, then a PATH search.
///
/// An override path that does not exist fails loudly rather than
/// silently falling back.
pub fn resolve_runner_executable(cancel: &CancelToken) -> Result<PathBuf> {
    if let Some(override_path) = env::var_os(RUNNER_PATH_ENV) {
        let path = PathBuf::from(override_path);
        std::fs::metadata(&path).map_err(|e| {
            MusterError::io(
                format!("executable from {} not found", RUNNER_PATH_ENV),
                e,
            )
        })?;
        return Ok(path);
    }

    if let Ok(current) = env::current_exe()
        && let Some(dir) = current.parent()
    {
        let sibling = dir.join(RUNNER_EXECUTABLE_NAME);
        if sibling.exists() {
            return Ok(sibling);
        }
    }

    lookup_executable(cancel, &[RUNNER_EXECUTABLE_NAME])
}

/// Spawner that launches `muster-runner <execution-id>` detached from
/// the caller's session.
pub struct DetachedSpawner;

impl Spawner for DetachedSpawner {
    fn spawn(&self, cancel: &CancelToken, id: &ExecutionId) -> Result<()> {
        cancel.check()?;

        let executable = resolve_runner_executable(cancel)?;
        debug!(runner = %executable.display(), execution = %id, "spawning detached runner");

        let mut command = Command::new(&executable);
        command
            .arg(id.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        // New process group, so the runner survives the caller's
        // terminal and is not reached by its signals.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let child = command.spawn().map_err(|e| {
            MusterError::io(format!("start runner '{}'", executable.display()), e)
        })?;

        // Dropping the handle releases the child without waiting on it.
        drop(child);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn override_path_must_exist() {
        unsafe { env::set_var(RUNNER_PATH_ENV, "/nonexistent/muster-runner") };

        let result = resolve_runner_executable(&CancelToken::new());

        unsafe { env::remove_var(RUNNER_PATH_ENV) };

        match result {
            Err(MusterError::Io { context, .. }) => {
                assert!(context.contains(RUNNER_PATH_ENV));
            }
            other => panic!("expected loud Io failure, got {:?}", other),
        }
    }

    #[test]
    #[serial]
    #[cfg(unix)]
    fn override_path_wins_over_search() {
        use std::os::unix::fs::PermissionsExt;
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("custom-runner");
        std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        unsafe { env::set_var(RUNNER_PATH_ENV, &path) };

        let resolved = resolve_runner_executable(&CancelToken::new());

        unsafe { env::remove_var(RUNNER_PATH_ENV) };

        assert_eq!(resolved.unwrap(), path);
    }

    struct RecordingSpawner {
        spawned: std::sync::Mutex<Vec<ExecutionId>>,
    }

    impl Spawner for RecordingSpawner {
        fn spawn(&self, _cancel: &CancelToken, id: &ExecutionId) -> Result<()> {
            self.spawned.lock().unwrap().push(id.clone());
            Ok(())
        }
    }

    #[test]
    fn fake_spawner_stands_in_for_detached_spawner() {
        let spawner = RecordingSpawner {
            spawned: std::sync::Mutex::new(Vec::new()),
        };
        let id = ExecutionId::generate();

        spawner.spawn(&CancelToken::new(), &id).unwrap();

        assert_eq!(spawner.spawned.lock().unwrap().as_slice(), &[id]);
    }
}
