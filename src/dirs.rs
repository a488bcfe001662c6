//! Resolution of the on-disk directories muster uses.
//!
//! Each location has an environment override; without one it defaults
//! to a subdirectory of `~/.muster`. Overrides may start with `~`,
//! which expands to the home directory, and must resolve to an
//! absolute path since relative state locations silently depend on the
//! caller's working directory.

use crate::error::{MusterError, Result};
use std::env;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Override for the state directory holding the execution store.
pub const STATE_DIR_ENV: &str = "MUSTER_STATE_DIR";

/// Override for the agent definitions directory.
pub const AGENTS_DIR_ENV: &str = "MUSTER_AGENTS_DIR";

/// Override for the runtime session log directory.
pub const RUNTIME_LOG_DIR_ENV: &str = "MUSTER_RUNTIME_LOG_DIR";

const EXECUTIONS_SUBDIR: &str = "executions";

/// The state directory. Executions live beneath it.
pub fn state_dir() -> Result<PathBuf> {
    resolve(STATE_DIR_ENV, &["state"])
}

/// The execution store root.
pub fn executions_dir() -> Result<PathBuf> {
    Ok(state_dir()?.join(EXECUTIONS_SUBDIR))
}

/// The agent definitions directory.
pub fn agents_dir() -> Result<PathBuf> {
    resolve(AGENTS_DIR_ENV, &["agents"])
}

/// The root under which runtimes write per-session I/O logs.
pub fn runtime_log_dir() -> Result<PathBuf> {
    resolve(RUNTIME_LOG_DIR_ENV, &["logs", "runtime"])
}

fn resolve(env_var: &str, default_subpath: &[&str]) -> Result<PathBuf> {
    if let Some(value) = env::var_os(env_var) {
        let Some(value) = value.to_str().map(str::to_string) else {
            return Err(invalid(env_var, "is not valid UTF-8"));
        };
        let path = expand_home(&value)?;
        if !path.is_absolute() {
            return Err(invalid(env_var, "must be an absolute path"));
        }
        return Ok(path);
    }

    let mut path = home_dir()?.join(".muster");
    for segment in default_subpath {
        path.push(segment);
    }
    Ok(path)
}

fn expand_home(value: &str) -> Result<PathBuf> {
    if value == "~" {
        return home_dir();
    }
    if let Some(rest) = value.strip_prefix("~/") {
        return Ok(home_dir()?.join(rest));
    }
    Ok(PathBuf::from(value))
}

fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| {
        MusterError::io(
            "resolve home directory",
            std::io::Error::new(ErrorKind::NotFound, "no home directory for current user"),
        )
    })
}

fn invalid(env_var: &str, reason: &str) -> MusterError {
    MusterError::io(
        format!("resolve {}", env_var),
        std::io::Error::new(ErrorKind::InvalidInput, format!("{} {}", env_var, reason)),
    )
}
