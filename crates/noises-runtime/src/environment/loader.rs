//! Platform native loader backed by `libloading`.
//!
//! - Unix: `dlopen(RTLD_NOW | RTLD_GLOBAL)` so later libraries resolve
//!   symbols against earlier ones. Per-directory registration does not exist.
//! - Windows: `AddDllDirectory` for registration and `LoadLibraryExW` with
//!   the default-dirs search flags for loads.
//!
//! Handles are kept until the loader is dropped. The loader returned by
//! `platform_loader` lives for the whole process.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use noises_core::ports::{LoaderError, NativeLoader};
use tracing::trace;

#[cfg(unix)]
use libloading::os::unix::{Library, RTLD_GLOBAL, RTLD_NOW};
#[cfg(windows)]
use libloading::os::windows::{
    LOAD_LIBRARY_SEARCH_DEFAULT_DIRS, LOAD_LIBRARY_SEARCH_DLL_LOAD_DIR, Library,
};

/// Loader that keeps every successfully opened library resident.
#[derive(Default)]
pub struct DynamicLoader {
    handles: Mutex<HashMap<PathBuf, Library>>,
}

impl std::fmt::Debug for DynamicLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.handles.lock().map(|h| h.len()).unwrap_or_default();
        f.debug_struct("DynamicLoader")
            .field("loaded", &count)
            .finish()
    }
}

impl DynamicLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loaded_count(&self) -> usize {
        self.handles.lock().map(|h| h.len()).unwrap_or_default()
    }

    fn keep(&self, key: PathBuf, library: Library) {
        if let Ok(mut handles) = self.handles.lock() {
            handles.entry(key).or_insert(library);
        }
    }
}

/// The loader for this platform, shared by the preparer and the import check.
pub fn platform_loader() -> Arc<dyn NativeLoader> {
    Arc::new(DynamicLoader::new())
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn open_library(target: &std::ffi::OsStr) -> Result<Library, libloading::Error> {
    // SAFETY: loading a library runs its initialisers; the runtime libraries
    // are trusted files from the prepared cache or the system search path.
    unsafe { Library::open(Some(target), RTLD_NOW | RTLD_GLOBAL) }
}

#[cfg(windows)]
#[allow(unsafe_code)]
fn open_library(target: &std::ffi::OsStr) -> Result<Library, libloading::Error> {
    // SAFETY: see the Unix variant.
    unsafe {
        Library::load_with_flags(
            target,
            LOAD_LIBRARY_SEARCH_DEFAULT_DIRS | LOAD_LIBRARY_SEARCH_DLL_LOAD_DIR,
        )
    }
}

#[cfg(windows)]
#[allow(unsafe_code)]
fn add_dll_directory(dir: &Path) -> std::io::Result<()> {
    use std::os::windows::ffi::OsStrExt;
    use windows::Win32::System::LibraryLoader::AddDllDirectory;
    use windows::core::PCWSTR;

    let wide: Vec<u16> = dir.as_os_str().encode_wide().chain(Some(0)).collect();
    // SAFETY: `wide` is NUL-terminated and outlives the call.
    let cookie = unsafe { AddDllDirectory(PCWSTR(wide.as_ptr())) };
    if cookie.is_null() {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

impl NativeLoader for DynamicLoader {
    fn name(&self) -> &'static str {
        if cfg!(windows) { "LoadLibraryExW" } else { "dlopen" }
    }

    fn register_directory(&self, dir: &Path) -> Result<(), LoaderError> {
        #[cfg(windows)]
        {
            add_dll_directory(dir).map_err(|e| LoaderError::Registration {
                dir: dir.to_path_buf(),
                reason: e.to_string(),
            })
        }

        #[cfg(not(windows))]
        {
            let _ = dir;
            Err(LoaderError::Unsupported)
        }
    }

    fn load(&self, library: &Path) -> Result<(), LoaderError> {
        if self.is_loaded(library) {
            trace!(library = %library.display(), "already loaded");
            return Ok(());
        }
        let handle = open_library(library.as_os_str()).map_err(|e| LoaderError::Load {
            library: library.display().to_string(),
            reason: e.to_string(),
        })?;
        self.keep(library.to_path_buf(), handle);
        Ok(())
    }

    fn load_by_name(&self, file_name: &str) -> Result<(), LoaderError> {
        let key = PathBuf::from(file_name);
        if self.is_loaded(&key) {
            return Ok(());
        }
        let handle = open_library(std::ffi::OsStr::new(file_name)).map_err(|e| {
            LoaderError::Load {
                library: file_name.to_string(),
                reason: e.to_string(),
            }
        })?;
        self.keep(key, handle);
        Ok(())
    }

    fn is_loaded(&self, library: &Path) -> bool {
        self.handles
            .lock()
            .is_ok_and(|handles| handles.contains_key(library))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_library_is_a_load_error() {
        let loader = DynamicLoader::new();
        let err = loader
            .load(Path::new("/definitely/missing/libnothing.so"))
            .unwrap_err();
        assert!(matches!(err, LoaderError::Load { .. }));
        assert_eq!(loader.loaded_count(), 0);
    }

    #[test]
    fn garbage_file_fails_without_panicking() {
        let temp = tempdir().unwrap();
        let fake = temp.path().join(if cfg!(windows) { "fake.dll" } else { "libfake.so" });
        std::fs::write(&fake, b"not a shared object").unwrap();

        let loader = DynamicLoader::new();
        assert!(loader.load(&fake).is_err());
        assert!(!loader.is_loaded(&fake));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn system_library_loads_once() {
        let loader = DynamicLoader::new();
        loader.load_by_name("libc.so.6").unwrap();
        loader.load_by_name("libc.so.6").unwrap();
        assert_eq!(loader.loaded_count(), 1);
        assert!(loader.is_loaded(Path::new("libc.so.6")));
    }

    #[cfg(unix)]
    #[test]
    fn registration_is_unsupported_on_unix() {
        let loader = DynamicLoader::new();
        assert!(matches!(
            loader.register_directory(Path::new("/tmp")),
            Err(LoaderError::Unsupported)
        ));
    }
}
