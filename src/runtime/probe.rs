//! Shared discovery and version probing for agent CLIs.

use crate::cancel::CancelToken;
use crate::error::{MusterError, Result};
use crate::process::lookup_executable;
use crate::runtime::RuntimeInfo;
use regex::Regex;
use std::process::Command;
use std::sync::OnceLock;

fn semver_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+\.\d+\.\d+").expect("semver pattern is valid"))
}

/// Whether the executable is resolvable. "Not found" is `Ok(false)`;
/// any other lookup failure propagates.
pub(crate) fn discover(cancel: &CancelToken, executable: &str) -> Result<bool> {
    cancel.check()?;

    match lookup_executable(cancel, &[executable]) {
        Ok(_) => Ok(true),
        Err(MusterError::ExecutableNotFound(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Run the executable's `--version` flag and extract a semantic-version
/// shaped substring from its combined output.
pub(crate) fn probe_version(cancel: &CancelToken, executable: &str) -> Result<RuntimeInfo> {
    cancel.check()?;

    let path = lookup_executable(cancel, &[executable])?;

    let output = Command::new(&path)
        .arg("--version")
        .output()
        .map_err(|e| MusterError::io(format!("read {} version", executable), e))?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    let version = semver_pattern()
        .find(&combined)
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| {
            MusterError::Runtime {
                message: format!(
                    "parse {} version from output: {}",
                    executable,
                    combined.trim()
                ),
                exit_code: None,
            }
        })?;

    Ok(RuntimeInfo { version })
}
