//! Environment preparation before the runtime is first used.
//!
//! Preparation is idempotent and best-effort: every directory registration
//! and every preload is attempted, failures are recorded in `LoadReport`s,
//! and the caller judges overall success by the importability check that
//! follows.

pub mod env_vars;
pub mod loader;
pub mod preload;
pub mod search_plan;

use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use noises_core::ports::{LoaderError, NativeLoader};
use noises_core::{BootstrapConfig, LibrarySearchPlan, LoadReport};
use tracing::{debug, info, warn};

pub use env_vars::{
    EnvironmentSink, MODULE_PATH_VAR, MemoryEnvironment, ProcessEnvironment, library_path_var,
    prepend_path_list,
};
pub use loader::{DynamicLoader, platform_loader};
pub use search_plan::{DiscoveryContext, discover, driver_dirs, toolkit_roots};

/// Everything a preparation pass did.
#[derive(Debug, Clone, Default)]
pub struct PreparationReport {
    pub search_plan: LibrarySearchPlan,
    pub registration: LoadReport,
    pub companions: LoadReport,
    pub preloads: LoadReport,
}

/// Prepares the process so the runtime's native libraries can be found.
#[cfg_attr(test, mockall::automock)]
pub trait RuntimePreparer: Send + Sync {
    fn prepare(&self, cache_dir: &Path) -> PreparationReport;
}

pub struct EnvironmentPreparer {
    config: Arc<BootstrapConfig>,
    loader: Arc<dyn NativeLoader>,
    env: Arc<dyn EnvironmentSink>,
}

impl EnvironmentPreparer {
    pub fn new(
        config: Arc<BootstrapConfig>,
        loader: Arc<dyn NativeLoader>,
        env: Arc<dyn EnvironmentSink>,
    ) -> Self {
        Self {
            config,
            loader,
            env,
        }
    }

    fn discovery_context(&self, cache_dir: &Path) -> DiscoveryContext {
        DiscoveryContext {
            cache_dir: cache_dir.to_path_buf(),
            runtime_package_dir: self.config.runtime_package_dir.clone(),
            bundle_dir: self.config.bundle_dir.clone(),
            exe_dir: exe_dir(),
            toolkit_roots: toolkit_roots(&self.config.toolkit_overrides),
            driver_dirs: driver_dirs(),
        }
    }

    fn apply_runtime_env(&self) {
        for (key, value) in &self.config.runtime_env {
            if self.env.get(key).as_deref() != Some(OsStr::new(value)) {
                debug!(var = %key, value = %value, "setting runtime variable");
                self.env.set(key, OsStr::new(value));
            }
        }
    }

    fn register_directories(&self, plan: &LibrarySearchPlan) -> LoadReport {
        let mut report = LoadReport::new();
        let mut unsupported = false;

        for dir in plan.dirs() {
            match self.loader.register_directory(dir) {
                Ok(()) => {
                    debug!(dir = %dir.display(), "registered library directory");
                    report.record_success(dir.clone());
                }
                Err(LoaderError::Unsupported) => {
                    unsupported = true;
                    report.record_failure(dir.clone(), LoaderError::Unsupported.to_string());
                }
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "directory registration failed");
                    report.record_failure(dir.clone(), e.to_string());
                }
            }
        }

        if unsupported {
            debug!(
                loader = self.loader.name(),
                "loader has no directory registration; relying on {}",
                library_path_var()
            );
        } else {
            info!(
                registered = report.succeeded.len(),
                total = report.total(),
                "registered library directories"
            );
        }
        report
    }

    fn log_critical_libraries(&self, plan: &LibrarySearchPlan) {
        for critical in &self.config.preload.critical_libraries {
            match find_library(plan.dirs(), critical) {
                Some(path) => info!(library = %critical, path = %path.display(), "found critical library"),
                None => warn!(library = %critical, "critical library not found in any registered directory"),
            }
        }
    }

    fn companion_search_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self
            .config
            .bundle_dir
            .iter()
            .cloned()
            .chain(exe_dir())
            .collect();

        if let Some(prefix) = self.config.host_interpreter.as_deref().and_then(Path::parent) {
            dirs.push(prefix.to_path_buf());
            if let Some(root) = prefix.parent() {
                dirs.push(root.join("lib"));
            }
        }

        #[cfg(windows)]
        if let Some(root) = env::var_os("SystemRoot") {
            dirs.push(PathBuf::from(root).join("System32"));
        }

        dirs
    }
}

impl RuntimePreparer for EnvironmentPreparer {
    fn prepare(&self, cache_dir: &Path) -> PreparationReport {
        info!(cache = %cache_dir.display(), "preparing runtime environment");

        self.apply_runtime_env();
        prepend_path_list(self.env.as_ref(), MODULE_PATH_VAR, &[cache_dir.to_path_buf()]);

        let search_plan = discover(&self.discovery_context(cache_dir));
        info!(dirs = search_plan.len(), "discovered library directories");

        let registration = self.register_directories(&search_plan);
        let added = prepend_path_list(self.env.as_ref(), library_path_var(), search_plan.dirs());
        debug!(var = library_path_var(), added, "extended library search variable");

        self.log_critical_libraries(&search_plan);

        let companion_files = preload::find_companions(
            &self.companion_search_dirs(),
            self.config.interpreter_version,
            &self.config.preload.companion_libraries,
        );
        let companions = preload::execute(self.loader.as_ref(), &companion_files);

        let lib_dir = cache_dir.join(&self.config.runtime_package_dir).join("lib");
        let plan = preload::plan_for_dir(&lib_dir, &self.config.preload);
        if plan.is_empty() {
            warn!(dir = %lib_dir.display(), "no native libraries to preload");
        } else {
            info!(
                count = plan.len(),
                priority = plan.priority.len(),
                "pre-loading runtime libraries"
            );
        }
        let preloads = preload::execute(self.loader.as_ref(), plan.ordered());
        preload::log_summary(&preloads);
        for (library, reason) in &preloads.failed {
            warn!(library = %library.display(), %reason, "preload failed");
        }

        PreparationReport {
            search_plan,
            registration,
            companions,
            preloads,
        }
    }
}

fn exe_dir() -> Option<PathBuf> {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
}

/// First file in `dirs` whose stem starts with `stem`.
fn find_library(dirs: &[PathBuf], stem: &str) -> Option<PathBuf> {
    dirs.iter().find_map(|dir| {
        let entries = std::fs::read_dir(dir).ok()?;
        let mut matches: Vec<PathBuf> = entries
            .flatten()
            .filter(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                noises_core::domain::is_native_library(&name)
                    && noises_core::domain::library_stem(&name).starts_with(stem)
            })
            .map(|entry| entry.path())
            .collect();
        matches.sort();
        matches.into_iter().next()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use noises_core::ports::MockNativeLoader;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::tempdir;

    const LIB_EXT: &str = if cfg!(windows) { "dll" } else { "so" };
    const LIB_PREFIX: &str = if cfg!(windows) { "" } else { "lib" };

    fn lib(name: &str) -> String {
        format!("{LIB_PREFIX}{name}.{LIB_EXT}")
    }

    fn populated_cache() -> (tempfile::TempDir, PathBuf) {
        let temp = tempdir().unwrap();
        let cache = temp.path().join("runtime");
        let lib_dir = cache.join("torch").join("lib");
        fs::create_dir_all(&lib_dir).unwrap();
        for name in ["torch_python", "torch_cuda", "c10", "cudart"] {
            fs::write(lib_dir.join(lib(name)), b"").unwrap();
        }
        (temp, cache)
    }

    fn config_for(cache: &Path) -> Arc<BootstrapConfig> {
        let mut config = BootstrapConfig::new(
            cache.to_path_buf(),
            cache.join("setup.log"),
            cache.join("lock"),
        );
        config.runtime_env = vec![("KMP_DUPLICATE_LIB_OK".to_string(), "TRUE".to_string())];
        config.preload.companion_libraries.clear();
        Arc::new(config)
    }

    /// Loader double that records load order and remembers what it loaded.
    #[derive(Default)]
    struct RecordingLoader {
        loaded: Mutex<Vec<PathBuf>>,
    }

    impl NativeLoader for RecordingLoader {
        fn name(&self) -> &'static str {
            "recording"
        }
        fn register_directory(&self, _dir: &Path) -> Result<(), LoaderError> {
            Ok(())
        }
        fn load(&self, library: &Path) -> Result<(), LoaderError> {
            let mut loaded = self.loaded.lock().unwrap();
            if !loaded.iter().any(|p| p == library) {
                loaded.push(library.to_path_buf());
            }
            Ok(())
        }
        fn load_by_name(&self, _file_name: &str) -> Result<(), LoaderError> {
            Ok(())
        }
        fn is_loaded(&self, library: &Path) -> bool {
            self.loaded.lock().unwrap().iter().any(|p| p == library)
        }
    }

    #[test]
    fn prepare_sets_env_and_loads_bridge_last() {
        let (_temp, cache) = populated_cache();
        let loader = Arc::new(RecordingLoader::default());
        let env = Arc::new(MemoryEnvironment::new());
        let preparer = EnvironmentPreparer::new(config_for(&cache), loader.clone(), env.clone());

        let report = preparer.prepare(&cache);

        let lib_dir = cache.join("torch").join("lib").canonicalize().unwrap();
        assert_eq!(report.search_plan.dirs().first(), Some(&lib_dir));
        assert_eq!(report.preloads.succeeded.len(), 4);
        assert!(report.preloads.all_succeeded());

        let loaded = loader.loaded.lock().unwrap();
        let last = loaded.last().unwrap().file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(last, lib("torch_python"));

        assert_eq!(env.get("KMP_DUPLICATE_LIB_OK"), Some("TRUE".into()));
        let module_path = env.get(MODULE_PATH_VAR).unwrap();
        assert_eq!(env::split_paths(&module_path).next(), Some(cache.clone()));
        let lib_path = env.get(library_path_var()).unwrap();
        assert!(env::split_paths(&lib_path).any(|p| p == lib_dir));
    }

    #[test]
    fn prepare_twice_does_not_duplicate_entries() {
        let (_temp, cache) = populated_cache();
        let loader = Arc::new(RecordingLoader::default());
        let env = Arc::new(MemoryEnvironment::new());
        let preparer = EnvironmentPreparer::new(config_for(&cache), loader.clone(), env.clone());

        preparer.prepare(&cache);
        let first = env.get(library_path_var());
        preparer.prepare(&cache);

        assert_eq!(env.get(library_path_var()), first);
        assert_eq!(loader.loaded.lock().unwrap().len(), 4);
    }

    #[test]
    fn registration_failures_do_not_stop_preloads() {
        let (_temp, cache) = populated_cache();
        let mut loader = MockNativeLoader::new();
        loader.expect_name().return_const("mock");
        loader
            .expect_register_directory()
            .returning(|_| Err(LoaderError::Unsupported));
        loader.expect_load().returning(|_| Ok(()));

        let preparer = EnvironmentPreparer::new(
            config_for(&cache),
            Arc::new(loader),
            Arc::new(MemoryEnvironment::new()),
        );
        let report = preparer.prepare(&cache);

        assert!(report.registration.succeeded.is_empty());
        assert_eq!(report.registration.failed.len(), report.search_plan.len());
        assert_eq!(report.preloads.succeeded.len(), 4);
    }

    #[test]
    fn critical_library_lookup_matches_stem_prefix() {
        let (_temp, cache) = populated_cache();
        let lib_dir = cache.join("torch").join("lib");

        assert_eq!(
            find_library(&[lib_dir.clone()], "cudart"),
            Some(lib_dir.join(lib("cudart")))
        );
        assert_eq!(find_library(&[lib_dir], "cublas"), None);
    }
}
