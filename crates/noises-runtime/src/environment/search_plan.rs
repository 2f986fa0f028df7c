//! Discovering directories that hold the runtime's native libraries.

#[cfg(windows)]
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use noises_core::domain::is_native_library;
use noises_core::LibrarySearchPlan;

/// Recursion limit for directory walks.
const MAX_WALK_DEPTH: usize = 6;

/// Inputs to directory discovery.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryContext {
    pub cache_dir: PathBuf,
    pub runtime_package_dir: String,
    pub bundle_dir: Option<PathBuf>,
    pub exe_dir: Option<PathBuf>,
    pub toolkit_roots: Vec<PathBuf>,
    pub driver_dirs: Vec<PathBuf>,
}

/// Build the ordered search plan:
/// runtime folders, bundle and executable dirs, library-bearing dirs of the
/// runtime tree, vendor packages, accelerator toolkits, driver dirs.
pub fn discover(ctx: &DiscoveryContext) -> LibrarySearchPlan {
    let mut plan = LibrarySearchPlan::new();
    let runtime_root = ctx.cache_dir.join(&ctx.runtime_package_dir);

    add_existing(&mut plan, &runtime_root.join("lib"));
    add_existing(&mut plan, &runtime_root.join("bin"));

    for dir in ctx.bundle_dir.iter().chain(ctx.exe_dir.iter()) {
        add_existing(&mut plan, dir);
    }

    for dir in native_library_dirs(&runtime_root) {
        add_existing(&mut plan, &dir);
    }

    for package in sorted_subdirs(&ctx.cache_dir.join("nvidia")) {
        add_existing(&mut plan, &package);
        add_existing(&mut plan, &package.join("lib"));
        add_existing(&mut plan, &package.join("bin"));
        for dir in native_library_dirs(&package) {
            add_existing(&mut plan, &dir);
        }
    }

    for root in &ctx.toolkit_roots {
        for sub in toolkit_subdirs(root) {
            add_existing(&mut plan, &sub);
        }
        for dir in native_library_dirs(root) {
            add_existing(&mut plan, &dir);
        }
    }

    for dir in &ctx.driver_dirs {
        add_existing(&mut plan, dir);
    }

    plan
}

/// Add `dir` if it exists, keyed by its absolute form.
fn add_existing(plan: &mut LibrarySearchPlan, dir: &Path) {
    if dir.is_dir() {
        plan.push(absolute_dir(dir));
    }
}

#[cfg(windows)]
fn absolute_dir(dir: &Path) -> PathBuf {
    // canonicalize() yields \\?\ paths, which some loaders reject
    std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf())
}

#[cfg(not(windows))]
fn absolute_dir(dir: &Path) -> PathBuf {
    dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf())
}

fn toolkit_subdirs(root: &Path) -> [PathBuf; 4] {
    [
        root.join("bin"),
        root.join("lib64"),
        root.join("lib").join("x64"),
        root.join("lib"),
    ]
}

/// Every directory at or below `root` that directly contains a native
/// library, in sorted walk order.
pub fn native_library_dirs(root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    walk(root, 0, &mut found);
    found
}

fn walk(dir: &Path, depth: usize, found: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    let mut subdirs = Vec::new();
    let mut has_library = false;
    for entry in entries.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            subdirs.push(entry.path());
        } else if is_native_library(&entry.file_name().to_string_lossy()) {
            has_library = true;
        }
    }

    if has_library {
        found.push(dir.to_path_buf());
    }
    if depth >= MAX_WALK_DEPTH {
        return;
    }
    subdirs.sort();
    for sub in subdirs {
        walk(&sub, depth + 1, found);
    }
}

fn sorted_subdirs(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut dirs: Vec<PathBuf> = entries
        .flatten()
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
        .map(|entry| entry.path())
        .collect();
    dirs.sort();
    dirs
}

/// Accelerator toolkit roots: overrides first, then standard install
/// locations, newest version first.
pub fn toolkit_roots(overrides: &[PathBuf]) -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = overrides.iter().filter(|p| p.is_dir()).cloned().collect();

    #[cfg(windows)]
    {
        let program_files = env::var_os("ProgramFiles")
            .map_or_else(|| PathBuf::from(r"C:\Program Files"), PathBuf::from);
        let base = program_files.join("NVIDIA GPU Computing Toolkit").join("CUDA");
        let mut versions: Vec<PathBuf> = sorted_subdirs(&base)
            .into_iter()
            .filter(|dir| dir.file_name().is_some_and(|n| n.to_string_lossy().starts_with('v')))
            .collect();
        sort_newest_first(&mut versions);
        roots.extend(versions);
    }

    #[cfg(not(windows))]
    {
        let mut versioned: Vec<PathBuf> = fs::read_dir("/usr/local")
            .into_iter()
            .flatten()
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .is_some_and(|n| n.to_string_lossy().starts_with("cuda"))
                    && path.is_dir()
            })
            .collect();
        sort_newest_first(&mut versioned);
        roots.extend(versioned);
        roots.push(PathBuf::from("/opt/cuda"));
    }

    roots.retain(|root| root.is_dir());
    roots
}

/// `(major, minor)` from a toolkit directory name such as `cuda-12.4`,
/// `cuda12` or `v11.8`.
fn toolkit_version(dir: &Path) -> Option<(u32, u32)> {
    let name = dir.file_name()?.to_str()?;
    let digits = name.trim_start_matches(|c: char| !c.is_ascii_digit());
    let mut parts = digits.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().map_or(Some(0), |minor| minor.parse().ok())?;
    Some((major, minor))
}

/// Highest version first; unversioned names last, by name.
fn sort_newest_first(dirs: &mut [PathBuf]) {
    dirs.sort_by(|a, b| {
        toolkit_version(b)
            .cmp(&toolkit_version(a))
            .then_with(|| a.cmp(b))
    });
}

/// Directories where the vendor driver installs its user-mode libraries.
pub fn driver_dirs() -> Vec<PathBuf> {
    #[cfg(windows)]
    {
        let system_root = env::var_os("SystemRoot")
            .map_or_else(|| PathBuf::from(r"C:\Windows"), PathBuf::from);
        let mut dirs = vec![system_root.join("System32")];
        for var in ["ProgramFiles", "ProgramFiles(x86)"] {
            if let Some(base) = env::var_os(var) {
                dirs.extend(native_library_dirs(&PathBuf::from(base).join("NVIDIA Corporation")));
            }
        }
        dirs
    }

    #[cfg(not(windows))]
    {
        ["/usr/lib/wsl/lib", "/usr/lib/x86_64-linux-gnu"]
            .iter()
            .map(PathBuf::from)
            .filter(|dir| dir.is_dir())
            .collect()
    }
}
