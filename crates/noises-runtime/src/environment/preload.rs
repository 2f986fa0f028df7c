//! Building and executing the explicit preload sequence.

use std::fs;
use std::path::{Path, PathBuf};

use noises_core::domain::is_native_library;
use noises_core::ports::NativeLoader;
use noises_core::{InterpreterVersion, LoadReport, PreloadPlan, PreloadPolicy};
use tracing::{debug, info, warn};

/// Plan the preloads for every native library directly inside `lib_dir`.
pub fn plan_for_dir(lib_dir: &Path, policy: &PreloadPolicy) -> PreloadPlan {
    let Ok(entries) = fs::read_dir(lib_dir) else {
        return PreloadPlan::default();
    };
    let files = entries
        .flatten()
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file() || t.is_symlink()))
        .filter(|entry| is_native_library(&entry.file_name().to_string_lossy()))
        .map(|entry| entry.path());
    PreloadPlan::build(files, policy)
}

/// Load each file in order, recording per-item outcomes. Never stops early.
pub fn execute<'a>(
    loader: &dyn NativeLoader,
    files: impl IntoIterator<Item = &'a PathBuf>,
) -> LoadReport {
    let mut report = LoadReport::new();
    for file in files {
        match loader.load(file) {
            Ok(()) => {
                debug!(library = %display_name(file), "preloaded");
                report.record_success(file.clone());
            }
            Err(e) => {
                debug!(library = %display_name(file), error = %e, "preload failed");
                report.record_failure(file.clone(), e.to_string());
            }
        }
    }
    report
}

/// File names of the host interpreter's shared library for `version`.
pub fn interpreter_library_names(version: InterpreterVersion) -> Vec<String> {
    let InterpreterVersion { major, minor } = version;
    if cfg!(windows) {
        vec![format!("python{major}{minor}.dll"), format!("python{major}.dll")]
    } else if cfg!(target_os = "macos") {
        vec![format!("libpython{major}.{minor}.dylib")]
    } else {
        vec![
            format!("libpython{major}.{minor}.so.1.0"),
            format!("libpython{major}.{minor}.so"),
        ]
    }
}

/// Host companion libraries to load before anything from the cache: the
/// interpreter shared library plus the configured platform runtime list.
///
/// Each name resolves to the first directory in `search_dirs` containing
/// it; names found nowhere are skipped.
pub fn find_companions(
    search_dirs: &[PathBuf],
    version: InterpreterVersion,
    companion_names: &[String],
) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let interpreter_names = interpreter_library_names(version);

    if let Some(path) = first_existing(search_dirs, &interpreter_names) {
        found.push(path);
    } else {
        warn!(
            names = ?interpreter_names,
            "interpreter shared library not found; bridge library may fail to load"
        );
    }

    for name in companion_names {
        if let Some(path) = first_existing(search_dirs, std::slice::from_ref(name)) {
            found.push(path);
        }
    }
    found
}

fn first_existing(dirs: &[PathBuf], names: &[String]) -> Option<PathBuf> {
    names.iter().find_map(|name| {
        dirs.iter()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file())
    })
}

/// Log a one-line summary of a preload pass.
pub fn log_summary(report: &LoadReport) {
    info!(
        loaded = report.succeeded.len(),
        total = report.total(),
        "Pre-loaded {}/{} native libraries",
        report.succeeded.len(),
        report.total()
    );
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use noises_core::ports::{LoaderError, MockNativeLoader};
    use tempfile::tempdir;

    const LIB_EXT: &str = if cfg!(windows) { "dll" } else { "so" };
    const LIB_PREFIX: &str = if cfg!(windows) { "" } else { "lib" };

    fn lib(name: &str) -> String {
        format!("{LIB_PREFIX}{name}.{LIB_EXT}")
    }

    #[test]
    fn plan_ignores_non_libraries_and_puts_bridge_last() {
        let temp = tempdir().unwrap();
        for name in ["torch_python", "c10", "aoti_custom_ops", "cudart"] {
            fs::write(temp.path().join(lib(name)), b"").unwrap();
        }
        fs::write(temp.path().join("README.txt"), b"").unwrap();
        fs::create_dir(temp.path().join(lib("not_a_file"))).unwrap();

        let plan = plan_for_dir(temp.path(), &PreloadPolicy::default());
        let names: Vec<String> = plan
            .ordered()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(
            names,
            [lib("cudart"), lib("c10"), lib("aoti_custom_ops"), lib("torch_python")]
        );
    }

    #[test]
    fn missing_lib_dir_gives_empty_plan() {
        let temp = tempdir().unwrap();
        assert!(plan_for_dir(&temp.path().join("missing"), &PreloadPolicy::default()).is_empty());
    }

    #[test]
    fn execute_records_failures_and_continues() {
        let mut loader = MockNativeLoader::new();
        loader.expect_load().times(3).returning(|path| {
            if path.ends_with("bad.so") {
                Err(LoaderError::Load {
                    library: path.display().to_string(),
                    reason: "undefined symbol".to_string(),
                })
            } else {
                Ok(())
            }
        });

        let files = [
            PathBuf::from("/lib/a.so"),
            PathBuf::from("/lib/bad.so"),
            PathBuf::from("/lib/c.so"),
        ];
        let report = execute(&loader, &files);

        assert_eq!(report.succeeded, [files[0].clone(), files[2].clone()]);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].1.contains("undefined symbol"));
    }

    #[test]
    fn companions_resolve_first_directory_hit() {
        let temp = tempdir().unwrap();
        let bundle = temp.path().join("bundle");
        let exe = temp.path().join("exe");
        fs::create_dir_all(&bundle).unwrap();
        fs::create_dir_all(&exe).unwrap();

        let version = InterpreterVersion::new(3, 12);
        let interpreter = &interpreter_library_names(version)[0];
        fs::write(exe.join(interpreter), b"").unwrap();
        fs::write(bundle.join("vcruntime140.dll"), b"").unwrap();
        fs::write(exe.join("vcruntime140.dll"), b"").unwrap();

        let found = find_companions(
            &[bundle.clone(), exe.clone()],
            version,
            &["vcruntime140.dll".to_string(), "missing.dll".to_string()],
        );

        assert_eq!(found, [exe.join(interpreter), bundle.join("vcruntime140.dll")]);
    }
}
