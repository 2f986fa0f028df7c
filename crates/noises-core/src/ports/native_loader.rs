//! Native library loader port.
//!
//! One implementation is selected per platform at startup. Handles to loaded
//! libraries are kept for the lifetime of the process.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoaderError {
    /// The platform has no per-directory registration mechanism.
    #[error("directory registration is not supported on this platform")]
    Unsupported,

    #[error("Failed to register {dir}: {reason}")]
    Registration { dir: PathBuf, reason: String },

    #[error("Failed to load {library}: {reason}")]
    Load { library: String, reason: String },
}

/// Platform dynamic loader.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
pub trait NativeLoader: Send + Sync {
    /// Short name for logs (`dlopen`, `LoadLibraryExW`).
    fn name(&self) -> &'static str;

    /// Add `dir` to the loader's dependency search path.
    fn register_directory(&self, dir: &Path) -> Result<(), LoaderError>;

    /// Load a library from an explicit path and keep it resident.
    fn load(&self, library: &Path) -> Result<(), LoaderError>;

    /// Load a library by bare file name through the default search path.
    fn load_by_name(&self, file_name: &str) -> Result<(), LoaderError>;

    /// Whether `library` was already loaded through this loader.
    fn is_loaded(&self, library: &Path) -> bool;
}
