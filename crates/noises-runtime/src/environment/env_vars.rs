//! Process environment access for the preparer.
//!
//! Reads and writes go through `EnvironmentSink` so preparation can be
//! exercised in tests without touching the real process environment.

use std::collections::HashMap;
use std::env;
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::sync::Mutex;

/// Variable the platform loader consults for dependent libraries.
pub const fn library_path_var() -> &'static str {
    if cfg!(windows) {
        "PATH"
    } else if cfg!(target_os = "macos") {
        "DYLD_LIBRARY_PATH"
    } else {
        "LD_LIBRARY_PATH"
    }
}

/// Variable child interpreters use to locate modules.
pub const MODULE_PATH_VAR: &str = "PYTHONPATH";

pub trait EnvironmentSink: Send + Sync {
    fn get(&self, key: &str) -> Option<OsString>;
    fn set(&self, key: &str, value: &OsStr);
}

/// The real process environment.
///
/// Writes must not overlap with other threads running native code.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnvironment;

impl EnvironmentSink for ProcessEnvironment {
    fn get(&self, key: &str) -> Option<OsString> {
        env::var_os(key)
    }

    #[allow(unsafe_code)]
    fn set(&self, key: &str, value: &OsStr) {
        // SAFETY: std serializes its own env access, so the hazard is foreign
        // code calling getenv concurrently. Other threads alive here are the
        // watchdogs (PID polling, stdin reads) and the tokio workers driving
        // the signal listener; none of them enter native code. Cached runtime
        // libraries are loaded on the activating thread once preparation returns.
        unsafe {
            env::set_var(key, value);
        }
    }
}

/// In-memory environment for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryEnvironment {
    vars: Mutex<HashMap<String, OsString>>,
}

impl MemoryEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_var(self, key: &str, value: impl Into<OsString>) -> Self {
        if let Ok(mut vars) = self.vars.lock() {
            vars.insert(key.to_string(), value.into());
        }
        self
    }
}

impl EnvironmentSink for MemoryEnvironment {
    fn get(&self, key: &str) -> Option<OsString> {
        self.vars.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &OsStr) {
        if let Ok(mut vars) = self.vars.lock() {
            vars.insert(key.to_string(), value.to_os_string());
        }
    }
}

/// Prepend `dirs` to the path-list variable `key`, skipping entries that are
/// already present. Returns how many entries were added.
pub fn prepend_path_list(sink: &dyn EnvironmentSink, key: &str, dirs: &[PathBuf]) -> usize {
    let existing: Vec<PathBuf> = sink
        .get(key)
        .map(|value| env::split_paths(&value).collect())
        .unwrap_or_default();

    let mut added: Vec<PathBuf> = Vec::new();
    for dir in dirs {
        if !existing.contains(dir) && !added.contains(dir) {
            added.push(dir.clone());
        }
    }
    if added.is_empty() {
        return 0;
    }

    let count = added.len();
    let combined = added
        .into_iter()
        .chain(existing.into_iter().filter(|p| !p.as_os_str().is_empty()));
    match env::join_paths(combined) {
        Ok(value) => {
            sink.set(key, &value);
            count
        }
        Err(e) => {
            tracing::warn!(var = key, error = %e, "cannot extend path list");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepends_in_order_without_duplicates() {
        let existing = env::join_paths([PathBuf::from("/usr/lib"), PathBuf::from("/opt/a")]).unwrap();
        let sink = MemoryEnvironment::new().with_var("LD_LIBRARY_PATH", existing);

        let added = prepend_path_list(
            &sink,
            "LD_LIBRARY_PATH",
            &[
                PathBuf::from("/cache/torch/lib"),
                PathBuf::from("/opt/a"),
                PathBuf::from("/cache/nvidia/cublas/lib"),
                PathBuf::from("/cache/torch/lib"),
            ],
        );

        assert_eq!(added, 2);
        let value = sink.get("LD_LIBRARY_PATH").unwrap();
        let parts: Vec<PathBuf> = env::split_paths(&value).collect();
        assert_eq!(
            parts,
            [
                PathBuf::from("/cache/torch/lib"),
                PathBuf::from("/cache/nvidia/cublas/lib"),
                PathBuf::from("/usr/lib"),
                PathBuf::from("/opt/a"),
            ]
        );
    }

    #[test]
    fn second_prepend_is_a_no_op() {
        let sink = MemoryEnvironment::new();
        let dirs = [PathBuf::from("/cache")];

        assert_eq!(prepend_path_list(&sink, MODULE_PATH_VAR, &dirs), 1);
        assert_eq!(prepend_path_list(&sink, MODULE_PATH_VAR, &dirs), 0);
        assert_eq!(sink.get(MODULE_PATH_VAR), Some(OsString::from("/cache")));
    }
}
