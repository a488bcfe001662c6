//! Atomic filesystem operations.
//!
//! Every write follows the same pattern:
//! 1. Serialize the value in memory.
//! 2. Compute a sibling temp path (`<filename>~`) and refuse to proceed
//!    if it already exists. A present temp file means another writer is
//!    mid-write on the same destination.
//! 3. Write and fsync the temp file.
//! 4. Rename the temp file over the destination.
//!
//! The rename is the only mutation visible to readers, so concurrent
//! readers either see the old complete content or the new complete
//! content, never a partial file.
//!
//! On crash, a stale temp file may remain and blocks further writes to
//! that destination until removed. This is intentional: silent overwrite
//! of another writer's temp file would defeat the guard.

use crate::error::{MusterError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Atomically write bytes to a file.
///
/// Fails if the sibling temp path already exists. The parent directory
/// must already exist; callers create execution/config directories
/// explicitly so a typo'd path fails instead of materializing.
pub fn atomic_write_bytes(path: &Path, content: &[u8]) -> Result<()> {
    let temp_path = temp_path(path)?;

    if temp_path.exists() {
        return Err(MusterError::io(
            format!("write '{}'", path.display()),
            std::io::Error::new(
                ErrorKind::AlreadyExists,
                format!("temp file '{}' already exists", temp_path.display()),
            ),
        ));
    }

    write_and_sync(&temp_path, content)?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        MusterError::io(
            format!(
                "rename '{}' to '{}'",
                temp_path.display(),
                path.display()
            ),
            e,
        )
    })?;

    // Sync the parent directory so the rename itself is durable.
    if let Some(parent) = path.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }

    Ok(())
}

/// Atomically write a value as JSON.
pub fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value)
        .map_err(|e| MusterError::serde(format!("serialize '{}'", path.display()), e))?;
    atomic_write_bytes(path, &bytes)
}

/// Atomically write a value as YAML.
pub fn atomic_write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_yaml::to_string(value)
        .map_err(|e| MusterError::serde(format!("serialize '{}'", path.display()), e))?;
    atomic_write_bytes(path, content.as_bytes())
}

/// Read and deserialize a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read(path)
        .map_err(|e| MusterError::io(format!("read '{}'", path.display()), e))?;
    serde_json::from_slice(&content)
        .map_err(|e| MusterError::serde(format!("parse '{}'", path.display()), e))
}

/// Read and deserialize a YAML file.
pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .map_err(|e| MusterError::io(format!("read '{}'", path.display()), e))?;
    serde_yaml::from_str(&content)
        .map_err(|e| MusterError::serde(format!("parse '{}'", path.display()), e))
}

/// Sibling temp path for a target: `<filename>~` in the same directory.
fn temp_path(target: &Path) -> Result<PathBuf> {
    let file_name = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            MusterError::io(
                format!("write '{}'", target.display()),
                std::io::Error::new(ErrorKind::InvalidInput, "invalid file path"),
            )
        })?;

    let parent = target.parent().unwrap_or(Path::new("."));
    Ok(parent.join(format!("{}~", file_name)))
}

/// Write content to a file and sync it to disk.
fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(path)
        .map_err(|e| MusterError::io(format!("create temp file '{}'", path.display()), e))?;

    file.write_all(content).map_err(|e| {
        let _ = fs::remove_file(path);
        MusterError::io(format!("write temp file '{}'", path.display()), e)
    })?;

    file.sync_all().map_err(|e| {
        let _ = fs::remove_file(path);
        MusterError::io(format!("sync temp file '{}'", path.display()), e)
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn atomic_write_creates_new_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.json");

        atomic_write_bytes(&path, b"{\"ok\":true}").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"ok\":true}");
        assert!(!temp.path().join("out.json~").exists());
    }

    #[test]
    fn atomic_write_replaces_existing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.txt");
        fs::write(&path, "old").unwrap();

        atomic_write_bytes(&path, b"new").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn atomic_write_refuses_when_temp_exists() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.txt");
        fs::write(temp.path().join("out.txt~"), "in-flight").unwrap();

        let err = atomic_write_bytes(&path, b"new").unwrap_err();
        match err {
            MusterError::Io { source, .. } => {
                assert_eq!(source.kind(), ErrorKind::AlreadyExists);
            }
            other => panic!("expected Io error, got {:?}", other),
        }

        // Destination untouched, foreign temp file untouched.
        assert!(!path.exists());
        assert_eq!(
            fs::read_to_string(temp.path().join("out.txt~")).unwrap(),
            "in-flight"
        );
    }

    #[test]
    fn json_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sample.json");
        let value = Sample {
            name: "codex".into(),
            count: 3,
        };

        atomic_write_json(&path, &value).unwrap();
        let loaded: Sample = read_json(&path).unwrap();

        assert_eq!(loaded, value);
    }

    #[test]
    fn yaml_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sample.yaml");
        let value = Sample {
            name: "claude".into(),
            count: 0,
        };

        atomic_write_yaml(&path, &value).unwrap();
        let loaded: Sample = read_yaml(&path).unwrap();

        assert_eq!(loaded, value);
    }

    #[test]
    fn read_json_reports_parse_errors() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();

        let err = read_json::<Sample>(&path).unwrap_err();
        assert!(matches!(err, MusterError::Serde { .. }));
    }

    #[test]
    fn temp_path_is_sibling_with_tilde_suffix() {
        let temp = temp_path(Path::new("/some/dir/status.json")).unwrap();
        assert_eq!(temp, Path::new("/some/dir/status.json~"));
    }
}
