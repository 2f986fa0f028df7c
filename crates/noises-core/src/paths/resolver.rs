//! Resolved path snapshot for diagnostics.
//!
//! Captures every location the bootstrap touches in one call so the
//! `paths` command and tests see the same answer.

use std::path::PathBuf;

use super::{PathError, cache_root, data_root, is_packaged_executable, lock_file_path, log_file_path};

/// All resolved paths captured in a single struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    /// Root directory for per-user data (log, `.env`)
    pub data_root: PathBuf,
    /// Directory holding the acquired runtime tree
    pub cache_dir: PathBuf,
    /// Append-only setup log
    pub log_file: PathBuf,
    /// Single-instance lock file
    pub lock_file: PathBuf,
    /// Whether this executable is a packaged build
    pub packaged: bool,
}

impl ResolvedPaths {
    /// Resolve all paths using the current environment.
    pub fn resolve() -> Result<Self, PathError> {
        Ok(Self {
            data_root: data_root()?,
            cache_dir: cache_root()?,
            log_file: log_file_path()?,
            lock_file: lock_file_path(),
            packaged: is_packaged_executable(),
        })
    }
}

impl std::fmt::Display for ResolvedPaths {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "data_root = {}", self.data_root.display())?;
        writeln!(f, "cache_dir = {}", self.cache_dir.display())?;
        writeln!(f, "log_file = {}", self.log_file.display())?;
        writeln!(f, "lock_file = {}", self.lock_file.display())?;
        write!(f, "packaged = {}", self.packaged)
    }
}
