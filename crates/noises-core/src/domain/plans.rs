//! Library search and preload plans.
//!
//! Both plans are pure values: discovery of directories and files happens in
//! the runtime crate, which feeds the results in here.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Ordered, duplicate-free list of directories to register with the loader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibrarySearchPlan {
    dirs: Vec<PathBuf>,
    seen: HashSet<PathBuf>,
}

impl LibrarySearchPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `dir` unless it is already present. Returns `true` if added.
    pub fn push(&mut self, dir: impl Into<PathBuf>) -> bool {
        let dir = dir.into();
        if self.seen.contains(&dir) {
            return false;
        }
        self.seen.insert(dir.clone());
        self.dirs.push(dir);
        true
    }

    pub fn contains(&self, dir: &Path) -> bool {
        self.seen.contains(dir)
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }
}

impl<P: Into<PathBuf>> Extend<P> for LibrarySearchPlan {
    fn extend<I: IntoIterator<Item = P>>(&mut self, iter: I) {
        for dir in iter {
            self.push(dir);
        }
    }
}

/// Naming rules for ordering native library preloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreloadPolicy {
    /// Stems loaded first, in this order.
    pub priority_prefixes: Vec<String>,
    /// Entry-bridge library, always loaded last.
    pub bridge_library: String,
    /// Library whose presence means acceleration is available.
    pub accelerated_library: String,
    /// Libraries whose location is logged during preparation.
    pub critical_libraries: Vec<String>,
    /// Platform runtime libraries loaded before anything from the cache.
    pub companion_libraries: Vec<String>,
}

impl Default for PreloadPolicy {
    fn default() -> Self {
        let priority = [
            "cudart",
            "cublaslt",
            "cublas",
            "cudnn",
            "cufft",
            "curand",
            "cusolver",
            "cusparse",
            "nvrtc",
            "nvjitlink",
            "nvtoolsext",
            "cupti",
            "nccl",
            "zlib",
            "iomp",
            "gomp",
            "c10",
            "torch_global_deps",
            "torch_cpu",
            "torch",
            "c10_cuda",
            "torch_cuda",
        ];
        let companions: &[&str] = if cfg!(windows) {
            &["vcruntime140.dll", "vcruntime140_1.dll", "msvcp140.dll", "vcomp140.dll"]
        } else {
            &[]
        };

        Self {
            priority_prefixes: priority.iter().map(ToString::to_string).collect(),
            bridge_library: "torch_python".to_string(),
            accelerated_library: "torch_cuda".to_string(),
            critical_libraries: vec!["cudart".to_string(), "cublas".to_string()],
            companion_libraries: companions.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Whether `file_name` looks like a native shared library on this platform.
///
/// Matches `.so` and versioned `.so.N` on Linux, `.dylib` (and `.so`) on
/// macOS, `.dll` on Windows. Case-insensitive.
pub fn is_native_library(file_name: &str) -> bool {
    let lower = file_name.to_ascii_lowercase();
    if cfg!(windows) {
        return lower.ends_with(".dll");
    }
    if cfg!(target_os = "macos") && lower.ends_with(".dylib") {
        return true;
    }
    if lower.ends_with(".so") {
        return true;
    }
    // libfoo.so.12 / libfoo.so.12.4.1
    lower.find(".so.").is_some_and(|idx| {
        lower[idx + 4..]
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
    })
}

/// Normalised stem used for prefix matching: lowercase, no `lib` prefix,
/// everything from the first `.` dropped. `libcudart.so.12` → `cudart`.
pub fn library_stem(file_name: &str) -> String {
    let lower = file_name.to_ascii_lowercase();
    let trimmed = lower.strip_prefix("lib").unwrap_or(&lower);
    trimmed.split('.').next().unwrap_or_default().to_string()
}

/// Ordered set of libraries to load explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreloadPlan {
    pub priority: Vec<PathBuf>,
    pub remaining: Vec<PathBuf>,
    pub terminal: Vec<PathBuf>,
}

impl PreloadPlan {
    /// Partition `files` according to `policy`.
    ///
    /// Files are first sorted by lowercase name. Bridge files go to
    /// `terminal`. A file belongs to the priority group when its stem starts
    /// with a priority prefix; the longest matching prefix determines its
    /// rank so `c10_cuda` ranks with `c10_cuda`, not `c10`.
    pub fn build(files: impl IntoIterator<Item = PathBuf>, policy: &PreloadPolicy) -> Self {
        let mut files: Vec<PathBuf> = files.into_iter().collect();
        files.sort_by_key(|path| sort_key(path));

        let mut ranked: Vec<(usize, PathBuf)> = Vec::new();
        let mut plan = Self::default();

        for path in files {
            let stem = library_stem(&file_name(&path));
            if stem == policy.bridge_library {
                plan.terminal.push(path);
            } else if let Some(rank) = priority_rank(&stem, &policy.priority_prefixes) {
                ranked.push((rank, path));
            } else {
                plan.remaining.push(path);
            }
        }

        // Stable: equal ranks keep name order.
        ranked.sort_by_key(|(rank, _)| *rank);
        plan.priority = ranked.into_iter().map(|(_, path)| path).collect();
        plan
    }

    /// Load order: priority, then remaining, then the bridge.
    pub fn ordered(&self) -> impl Iterator<Item = &PathBuf> {
        self.priority
            .iter()
            .chain(self.remaining.iter())
            .chain(self.terminal.iter())
    }

    pub fn len(&self) -> usize {
        self.priority.len() + self.remaining.len() + self.terminal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn sort_key(path: &Path) -> String {
    file_name(path).to_ascii_lowercase()
}

fn priority_rank(stem: &str, prefixes: &[String]) -> Option<usize> {
    prefixes
        .iter()
        .enumerate()
        .filter(|(_, prefix)| stem.starts_with(&prefix.to_ascii_lowercase()))
        .max_by_key(|(_, prefix)| prefix.len())
        .map(|(rank, _)| rank)
}

/// Per-item outcome of a best-effort loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub succeeded: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl LoadReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, item: impl Into<PathBuf>) {
        self.succeeded.push(item.into());
    }

    pub fn record_failure(&mut self, item: impl Into<PathBuf>, reason: impl Into<String>) {
        self.failed.push((item.into(), reason.into()));
    }

    pub fn merge(&mut self, other: Self) {
        self.succeeded.extend(other.succeeded);
        self.failed.extend(other.failed);
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}
