//! Executable lookup across an ordered candidate list.

use crate::cancel::CancelToken;
use crate::error::{MusterError, Result};
use std::env;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Return the first resolvable absolute path for the given candidates.
///
/// Candidates are probed in order. A candidate that is simply not found
/// falls through to the next one; any other lookup failure propagates
/// immediately. Cancellation is checked between candidates. When every
/// candidate misses, the error is the distinct
/// [`MusterError::ExecutableNotFound`] condition.
pub fn lookup_executable(cancel: &CancelToken, candidates: &[&str]) -> Result<PathBuf> {
    cancel.check()?;

    for candidate in candidates {
        cancel.check()?;

        match find_candidate(candidate)? {
            Some(path) => return Ok(path),
            None => continue,
        }
    }

    Err(MusterError::ExecutableNotFound(candidates.join(", ")))
}

/// Resolve one candidate. `Ok(None)` means not found (try the next);
/// `Err` means a lookup failure that must not fall through.
fn find_candidate(candidate: &str) -> Result<Option<PathBuf>> {
    // A candidate containing a path separator is checked directly and
    // never searched on PATH.
    if candidate.contains(std::path::MAIN_SEPARATOR) {
        let path = Path::new(candidate);
        return probe(path).map(|found| found.then(|| absolutize(path)));
    }

    let Some(search_path) = env::var_os("PATH") else {
        return Ok(None);
    };

    for dir in env::split_paths(&search_path) {
        if dir.as_os_str().is_empty() {
            continue;
        }
        let path = dir.join(candidate);
        if probe(&path)? {
            return Ok(Some(absolutize(&path)));
        }
    }

    Ok(None)
}

/// Whether the path exists as an executable regular file.
fn probe(path: &Path) -> Result<bool> {
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        // A non-directory component mid-path also reads as "not here".
        Err(e) if e.kind() == ErrorKind::NotADirectory => return Ok(false),
        Err(e) => {
            return Err(MusterError::io(
                format!("probe executable '{}'", path.display()),
                e,
            ));
        }
    };

    if !metadata.is_file() {
        return Ok(false);
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        Ok(metadata.permissions().mode() & 0o111 != 0)
    }

    #[cfg(not(unix))]
    Ok(true)
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    #[cfg(unix)]
    fn make_executable(dir: &Path, name: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    #[serial]
    #[cfg(unix)]
    fn finds_first_resolvable_candidate() {
        let temp = TempDir::new().unwrap();
        let expected = make_executable(temp.path(), "fake-agent");

        let old_path = env::var_os("PATH");
        unsafe { env::set_var("PATH", temp.path()) };

        let found = lookup_executable(&CancelToken::new(), &["missing-agent", "fake-agent"]);

        match old_path {
            Some(p) => unsafe { env::set_var("PATH", p) },
            None => unsafe { env::remove_var("PATH") },
        }

        assert_eq!(found.unwrap(), expected);
    }

    #[test]
    #[serial]
    #[cfg(unix)]
    fn non_executable_files_are_skipped() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("fake-agent"), "not executable").unwrap();

        let old_path = env::var_os("PATH");
        unsafe { env::set_var("PATH", temp.path()) };

        let result = lookup_executable(&CancelToken::new(), &["fake-agent"]);

        match old_path {
            Some(p) => unsafe { env::set_var("PATH", p) },
            None => unsafe { env::remove_var("PATH") },
        }

        assert!(matches!(
            result,
            Err(MusterError::ExecutableNotFound(_))
        ));
    }

    #[test]
    fn exhausted_candidates_report_not_found() {
        let err = lookup_executable(
            &CancelToken::new(),
            &["definitely-not-installed-anywhere-1", "nor-this-2"],
        )
        .unwrap_err();

        match err {
            MusterError::ExecutableNotFound(names) => {
                assert!(names.contains("definitely-not-installed-anywhere-1"));
                assert!(names.contains("nor-this-2"));
            }
            other => panic!("expected ExecutableNotFound, got {:?}", other),
        }
    }

    #[test]
    fn cancellation_aborts_before_probing() {
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = lookup_executable(&cancel, &["sh"]);
        assert!(matches!(result, Err(MusterError::Cancelled)));
    }

    #[test]
    #[cfg(unix)]
    fn path_separator_candidate_is_checked_directly() {
        let temp = TempDir::new().unwrap();
        let path = make_executable(temp.path(), "direct-agent");
        let candidate = path.to_str().unwrap();

        let found = lookup_executable(&CancelToken::new(), &[candidate]).unwrap();
        assert_eq!(found, path);
    }
}
