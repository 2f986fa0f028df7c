//! Path utilities for Noises data, cache, log and lock locations.
//!
//! # Design
//!
//! - Returns `PathBuf` and `PathError` for clear error handling
//! - No interactive/terminal I/O
//! - OS-specific logic is kept private in `platform`

mod error;
mod platform;
mod resolver;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::PathError;
pub use platform::{
    cache_root, data_root, env_file_path, is_packaged_executable, lock_file_path, log_file_path,
};
pub use resolver::ResolvedPaths;
