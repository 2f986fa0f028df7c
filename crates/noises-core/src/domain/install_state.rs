//! On-disk installation state of the runtime cache.
//!
//! Two marker files live at the cache root:
//! - `.cuda_variant` holds the installed variant tag (one line)
//! - `.setup_complete` is written last, after acquisition succeeded
//!
//! A cache directory without the completion marker is garbage from an
//! interrupted install and must never be reused.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const VARIANT_MARKER: &str = ".cuda_variant";
pub const COMPLETION_MARKER: &str = ".setup_complete";

/// Snapshot of the runtime cache read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationState {
    pub cache_dir: PathBuf,
    pub exists: bool,
    pub variant_tag: Option<String>,
    pub completion_marker: bool,
    pub runtime_present: bool,
}

impl InstallationState {
    /// Read the state of `cache_dir`. `runtime_package_dir` is the
    /// subdirectory whose presence proves the tree was populated.
    pub fn read(cache_dir: &Path, runtime_package_dir: &str) -> Self {
        let exists = cache_dir.is_dir();
        let variant_tag = fs::read_to_string(cache_dir.join(VARIANT_MARKER))
            .ok()
            .map(|content| content.trim().to_string())
            .filter(|tag| !tag.is_empty());

        Self {
            cache_dir: cache_dir.to_path_buf(),
            exists,
            variant_tag,
            completion_marker: cache_dir.join(COMPLETION_MARKER).is_file(),
            runtime_present: cache_dir.join(runtime_package_dir).is_dir(),
        }
    }

    /// The cache can be used as-is.
    pub const fn is_valid(&self) -> bool {
        self.exists && self.completion_marker && self.runtime_present
    }

    /// A directory exists but no install ever completed into it.
    pub const fn is_partial(&self) -> bool {
        self.exists && !self.completion_marker
    }

    pub fn variant_label(&self) -> &str {
        self.variant_tag.as_deref().unwrap_or("unknown")
    }
}

/// Record a finished install: variant marker first, completion marker last.
pub fn mark_complete(cache_dir: &Path, variant_tag: &str) -> io::Result<()> {
    fs::write(cache_dir.join(VARIANT_MARKER), format!("{variant_tag}\n"))?;
    fs::write(cache_dir.join(COMPLETION_MARKER), b"")
}

/// Remove `cache_dir` if it holds a partial install.
///
/// Returns `true` when something was deleted.
pub fn discard_partial(cache_dir: &Path) -> io::Result<bool> {
    if cache_dir.is_dir() && !cache_dir.join(COMPLETION_MARKER).is_file() {
        fs::remove_dir_all(cache_dir)?;
        return Ok(true);
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_directory_is_neither_valid_nor_partial() {
        let temp = tempdir().unwrap();
        let state = InstallationState::read(&temp.path().join("runtime"), "torch");

        assert!(!state.exists);
        assert!(!state.is_valid());
        assert!(!state.is_partial());
        assert_eq!(state.variant_label(), "unknown");
    }

    #[test]
    fn complete_cache_is_valid() {
        let temp = tempdir().unwrap();
        fs::create_dir(temp.path().join("torch")).unwrap();
        mark_complete(temp.path(), "cu124").unwrap();

        let state = InstallationState::read(temp.path(), "torch");
        assert!(state.is_valid());
        assert_eq!(state.variant_tag.as_deref(), Some("cu124"));
    }

    #[test]
    fn marker_without_runtime_tree_is_invalid() {
        let temp = tempdir().unwrap();
        mark_complete(temp.path(), "cu124").unwrap();

        let state = InstallationState::read(temp.path(), "torch");
        assert!(state.completion_marker);
        assert!(!state.is_valid());
        assert!(!state.is_partial());
    }

    #[test]
    fn partial_install_is_discarded() {
        let temp = tempdir().unwrap();
        let cache = temp.path().join("runtime");
        fs::create_dir_all(cache.join("torch")).unwrap();
        fs::write(cache.join(VARIANT_MARKER), "cu124\n").unwrap();

        assert!(InstallationState::read(&cache, "torch").is_partial());
        assert!(discard_partial(&cache).unwrap());
        assert!(!cache.exists());
    }

    #[test]
    fn completed_install_is_never_discarded() {
        let temp = tempdir().unwrap();
        mark_complete(temp.path(), "cu118").unwrap();

        assert!(!discard_partial(temp.path()).unwrap());
        assert!(temp.path().join(COMPLETION_MARKER).exists());
    }
}
