//! Locating the vendor diagnostic executable.
//!
//! Installer contexts often run with a trimmed `PATH`, so after the search
//! path we fall back to the system directory and the vendor's own install
//! locations.

#[cfg(windows)]
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

#[cfg(windows)]
const TOOL_FILE_NAME: &str = "nvidia-smi.exe";
#[cfg(not(windows))]
const TOOL_FILE_NAME: &str = "nvidia-smi";

/// Where to look for the diagnostic tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolLocator {
    /// `PATH`-style list; `None` reads the process `PATH`.
    search_path: Option<OsString>,
    fallback_dirs: Vec<PathBuf>,
}

impl ToolLocator {
    /// The process `PATH`, then the platform's vendor locations.
    pub fn system() -> Self {
        Self {
            search_path: None,
            fallback_dirs: default_fallback_dirs(),
        }
    }

    /// Search exactly `search_path`, then `fallback_dirs`, and nothing else.
    pub fn new(search_path: impl Into<OsString>, fallback_dirs: Vec<PathBuf>) -> Self {
        Self {
            search_path: Some(search_path.into()),
            fallback_dirs,
        }
    }

    pub fn fallback_dirs(&self) -> &[PathBuf] {
        &self.fallback_dirs
    }

    /// The search path first, then the fallback directories in order.
    pub fn locate(&self) -> Option<PathBuf> {
        let on_path = match &self.search_path {
            Some(paths) if paths.is_empty() => None,
            Some(paths) => which::which_in(TOOL_FILE_NAME, Some(paths), Path::new(".")).ok(),
            None => which::which(TOOL_FILE_NAME).ok(),
        };
        on_path.or_else(|| find_in_dirs(&self.fallback_dirs))
    }
}

impl Default for ToolLocator {
    fn default() -> Self {
        Self::system()
    }
}

/// Directories checked after `PATH`, in order.
fn default_fallback_dirs() -> Vec<PathBuf> {
    #[cfg(windows)]
    {
        let system_root = env::var_os("SystemRoot").map_or_else(|| PathBuf::from(r"C:\Windows"), PathBuf::from);
        let program_files = env::var_os("ProgramFiles")
            .map_or_else(|| PathBuf::from(r"C:\Program Files"), PathBuf::from);
        vec![
            system_root.join("System32"),
            program_files.join("NVIDIA Corporation").join("NVSMI"),
        ]
    }

    #[cfg(not(windows))]
    {
        vec![
            PathBuf::from("/usr/bin"),
            PathBuf::from("/usr/lib/wsl/lib"),
            PathBuf::from("/opt/nvidia/bin"),
            PathBuf::from("/usr/local/nvidia/bin"),
        ]
    }
}

/// First directory in `dirs` containing the diagnostic tool.
fn find_in_dirs(dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .map(|dir| dir.join(TOOL_FILE_NAME))
        .find(|candidate| is_file(candidate))
}

fn is_file(path: &Path) -> bool {
    path.metadata().is_ok_and(|m| m.is_file())
}
