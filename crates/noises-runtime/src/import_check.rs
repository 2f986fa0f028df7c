//! Native importability check.
//!
//! The runtime counts as importable when its entry-bridge library loads in
//! this process, and as accelerated when the accelerated backend library
//! loads as well.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use noises_core::domain::{is_native_library, library_stem};
use noises_core::ports::{ImportStatus, NativeLoader, RuntimeImportCheck};
use noises_core::PreloadPolicy;
use tracing::{debug, info};

pub struct NativeImportCheck {
    loader: Arc<dyn NativeLoader>,
    policy: PreloadPolicy,
    runtime_package_dir: String,
}

impl NativeImportCheck {
    pub fn new(
        loader: Arc<dyn NativeLoader>,
        policy: PreloadPolicy,
        runtime_package_dir: impl Into<String>,
    ) -> Self {
        Self {
            loader,
            policy,
            runtime_package_dir: runtime_package_dir.into(),
        }
    }

    fn check_cache(&self, cache_dir: &Path) -> ImportStatus {
        let runtime_root = cache_dir.join(&self.runtime_package_dir);
        let lib_dir = runtime_root.join("lib");

        let Some(bridge) = find_by_stem(&lib_dir, &self.policy.bridge_library) else {
            return ImportStatus::NotImportable {
                reason: format!(
                    "{} not found in {}",
                    self.policy.bridge_library,
                    lib_dir.display()
                ),
            };
        };

        if let Err(e) = self.loader.load(&bridge) {
            return ImportStatus::NotImportable {
                reason: e.to_string(),
            };
        }

        let accelerated = find_by_stem(&lib_dir, &self.policy.accelerated_library)
            .is_some_and(|lib| self.loader.load(&lib).is_ok());

        info!(location = %runtime_root.display(), accelerated, "runtime loaded from cache");
        ImportStatus::Importable {
            accelerated,
            location: Some(runtime_root),
        }
    }

    fn check_default_path(&self) -> ImportStatus {
        let bridge = platform_file_name(&self.policy.bridge_library);
        if let Err(e) = self.loader.load_by_name(&bridge) {
            debug!(library = %bridge, error = %e, "runtime not on default search path");
            return ImportStatus::NotImportable {
                reason: e.to_string(),
            };
        }

        let accelerated = self
            .loader
            .load_by_name(&platform_file_name(&self.policy.accelerated_library))
            .is_ok();

        ImportStatus::Importable {
            accelerated,
            location: None,
        }
    }
}

impl RuntimeImportCheck for NativeImportCheck {
    fn check<'a>(&self, cache_dir: Option<&'a Path>) -> ImportStatus {
        match cache_dir {
            Some(dir) => self.check_cache(dir),
            None => self.check_default_path(),
        }
    }
}

/// `torch_python` → `libtorch_python.so` / `torch_python.dll` / `libtorch_python.dylib`
pub fn platform_file_name(stem: &str) -> String {
    if cfg!(windows) {
        format!("{stem}.dll")
    } else if cfg!(target_os = "macos") {
        format!("lib{stem}.dylib")
    } else {
        format!("lib{stem}.so")
    }
}

fn find_by_stem(dir: &Path, stem: &str) -> Option<PathBuf> {
    let mut matches: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .flatten()
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            is_native_library(&name) && library_stem(&name) == stem
        })
        .map(|entry| entry.path())
        .collect();
    matches.sort();
    matches.into_iter().next()
}
