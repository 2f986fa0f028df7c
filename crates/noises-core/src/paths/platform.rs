//! Platform-specific path detection and resolution.
//!
//! Private helpers for detecting the runtime environment (source tree vs
//! packaged executable) and resolving platform-appropriate roots.
//! Public API is exposed through `paths`.

use std::env;
use std::fs;
use std::path::PathBuf;

use super::error::PathError;

const APP_DIR_NAME: &str = "Noises";
const LOG_FILE_NAME: &str = "setup.log";
const LOCK_FILE_NAME: &str = "noises-backend.lock";

/// Detect if we are running from the local repository.
///
/// Returns `Some(path)` when the current executable lives inside the source
/// tree it was built from (`cargo run`, `target/debug/...`). Returns `None`
/// for a standalone/packaged executable.
pub(super) fn detect_local_repo() -> Option<PathBuf> {
    let repo_root = PathBuf::from(env!("NOISES_REPO_ROOT"));

    if !repo_root.join("Cargo.toml").exists() {
        return None;
    }

    let exe = env::current_exe().ok()?.canonicalize().ok()?;
    let repo = repo_root.canonicalize().ok()?;

    exe.starts_with(&repo).then_some(repo_root)
}

/// Check if we are running as a packaged (frozen) executable.
///
/// Returns `true` for an installed/bundled binary, `false` when running
/// from the source repository.
pub fn is_packaged_executable() -> bool {
    detect_local_repo().is_none()
}

/// Get the root directory for per-user application data (log, `.env`).
///
/// Resolution order:
/// 1. `NOISES_DATA_DIR` environment variable (highest priority)
/// 2. System local data directory (e.g. `%LOCALAPPDATA%\Noises`)
pub fn data_root() -> Result<PathBuf, PathError> {
    if let Ok(path) = env::var("NOISES_DATA_DIR") {
        if path.trim().is_empty() {
            return Err(PathError::EmptyPath);
        }
        return Ok(PathBuf::from(path));
    }

    let data_dir = dirs::data_local_dir().ok_or(PathError::NoDataDir)?;
    let root = data_dir.join(APP_DIR_NAME);

    if !root.exists() {
        fs::create_dir_all(&root).map_err(|e| PathError::CreateFailed {
            path: root.clone(),
            reason: e.to_string(),
        })?;
    }

    Ok(root)
}

/// Get the machine-wide directory holding the acquired runtime tree.
///
/// Resolution order:
/// 1. `NOISES_CACHE_DIR` environment variable
/// 2. `%PROGRAMDATA%\Noises\runtime` on Windows
/// 3. System data directory (e.g. `~/.local/share/Noises/runtime`)
///
/// The directory is not created here; its existence is part of the
/// installation state.
pub fn cache_root() -> Result<PathBuf, PathError> {
    if let Ok(path) = env::var("NOISES_CACHE_DIR") {
        if path.trim().is_empty() {
            return Err(PathError::EmptyPath);
        }
        return Ok(PathBuf::from(path));
    }

    #[cfg(windows)]
    {
        if let Some(program_data) = env::var_os("PROGRAMDATA") {
            return Ok(PathBuf::from(program_data)
                .join(APP_DIR_NAME)
                .join("runtime"));
        }
    }

    let data_dir = dirs::data_dir()
        .or_else(dirs::home_dir)
        .ok_or(PathError::NoDataDir)?;
    Ok(data_dir.join(APP_DIR_NAME).join("runtime"))
}

/// Location of the append-only setup log.
pub fn log_file_path() -> Result<PathBuf, PathError> {
    if let Ok(path) = env::var("NOISES_LOG_FILE") {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    Ok(data_root()?.join(LOG_FILE_NAME))
}

/// Location of the single-instance lock file (machine temp directory).
pub fn lock_file_path() -> PathBuf {
    match env::var("NOISES_LOCK_FILE") {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => env::temp_dir().join(LOCK_FILE_NAME),
    }
}

/// Location of the `.env` file holding user overrides.
pub fn env_file_path() -> Result<PathBuf, PathError> {
    Ok(data_root()?.join(".env"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::test_utils::IsolatedEnv;
    use tempfile::tempdir;

    #[test]
    fn data_dir_override_takes_precedence() {
        let temp = tempdir().unwrap();
        let _env = IsolatedEnv::with_data_dir(temp.path());

        assert_eq!(data_root().unwrap(), temp.path());
        assert_eq!(log_file_path().unwrap(), temp.path().join("setup.log"));
    }

    #[test]
    fn cache_override_is_not_created() {
        let temp = tempdir().unwrap();
        let cache = temp.path().join("runtime");
        let env = IsolatedEnv::new();
        env.set("NOISES_CACHE_DIR", &cache);

        assert_eq!(cache_root().unwrap(), cache);
        assert!(!cache.exists());
    }

    #[test]
    fn lock_file_defaults_to_temp_dir() {
        let _env = IsolatedEnv::new();

        let lock = lock_file_path();
        assert!(lock.starts_with(env::temp_dir()));
        assert!(lock.ends_with("noises-backend.lock"));
    }
}
