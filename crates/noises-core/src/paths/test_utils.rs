//! Isolation for tests that exercise the `NOISES_*` overrides.
//!
//! Path and bootstrap resolution read process-wide variables, so tests that
//! touch them take an [`IsolatedEnv`] first: it serializes those tests,
//! starts them from a clean slate and puts the caller's values back after.

use std::env;
use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Variables read by path resolution and `BootstrapConfig::from_env`.
pub const OVERRIDE_VARS: &[&str] = &[
    "NOISES_DATA_DIR",
    "NOISES_CACHE_DIR",
    "NOISES_LOG_FILE",
    "NOISES_LOCK_FILE",
    "NOISES_PACKAGED",
    "NOISES_PYTHON",
    "NOISES_PYTHON_ABI",
    "NOISES_ACQUISITION_ORDER",
    "NOISES_TOOLKIT_DIRS",
    "NOISES_BUNDLE_DIR",
    "CUDA_PATH",
];

static OVERRIDES_LOCK: Mutex<()> = Mutex::new(());

/// Exclusive, initially empty view of [`OVERRIDE_VARS`].
///
/// ```ignore
/// let env = IsolatedEnv::with_data_dir(temp.path());
/// env.set("NOISES_PACKAGED", "false");
/// let config = BootstrapConfig::from_env()?;
/// ```
pub struct IsolatedEnv {
    saved: Vec<(&'static str, Option<OsString>)>,
    // Dropped after `saved` has been written back.
    _lock: MutexGuard<'static, ()>,
}

impl IsolatedEnv {
    /// Wait for other isolated tests, then clear every override.
    pub fn new() -> Self {
        let lock = OVERRIDES_LOCK
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let saved = OVERRIDE_VARS
            .iter()
            .map(|key| (*key, env::var_os(key)))
            .collect();
        for key in OVERRIDE_VARS {
            write(key, None);
        }
        Self { saved, _lock: lock }
    }

    /// Isolated environment with `NOISES_DATA_DIR` pointing at `dir`.
    pub fn with_data_dir(dir: &Path) -> Self {
        let isolated = Self::new();
        isolated.set("NOISES_DATA_DIR", dir);
        isolated
    }

    /// Set an override until this guard drops.
    ///
    /// # Panics
    ///
    /// If `key` is not one of [`OVERRIDE_VARS`]; it would outlive the guard.
    pub fn set(&self, key: &str, value: impl AsRef<OsStr>) -> &Self {
        assert!(
            OVERRIDE_VARS.contains(&key),
            "{key} is not an isolated override"
        );
        write(key, Some(value.as_ref()));
        self
    }
}

impl Default for IsolatedEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for IsolatedEnv {
    fn drop(&mut self) {
        for (key, value) in &self.saved {
            write(key, value.as_deref());
        }
    }
}

#[allow(unsafe_code)]
fn write(key: &str, value: Option<&OsStr>) {
    // SAFETY: only called with OVERRIDES_LOCK held, and no code under test
    // reads these variables from another thread.
    unsafe {
        match value {
            Some(value) => env::set_var(key, value),
            None => env::remove_var(key),
        }
    }
}
