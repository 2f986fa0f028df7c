//! Bootstrap configuration.
//!
//! A single immutable value built once at startup and shared by reference
//! with every component. Defaults come from the platform path helpers and
//! can be overridden through `NOISES_*` environment variables (usually set
//! in the `.env` file under the data root).

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::domain::{PreloadPolicy, VariantTable, VersionParseError, parse_major_minor};
use crate::paths::{PathError, cache_root, is_packaged_executable, lock_file_path, log_file_path};
use crate::ports::StrategyKind;

/// Default probe timeout for the vendor diagnostic tool.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);
/// Default parent-liveness poll interval.
pub const DEFAULT_WATCHDOG_INTERVAL: Duration = Duration::from_secs(1);

/// `major.minor` of the interpreter ABI the runtime packages must match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InterpreterVersion {
    pub major: u32,
    pub minor: u32,
}

impl InterpreterVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// ABI compiled into this build (`NOISES_PYTHON_ABI` at build time).
    pub fn build_default() -> Self {
        env!("NOISES_BUILD_PYTHON_ABI")
            .parse()
            .unwrap_or(Self::new(3, 12))
    }
}

impl fmt::Display for InterpreterVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for InterpreterVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "Python 3.12.4" as printed by `python --version`
        let s = s.trim();
        let s = s.strip_prefix("Python").map_or(s, str::trim_start);
        parse_major_minor(s)
            .map(|(major, minor)| Self::new(major, minor))
            .ok_or_else(|| VersionParseError(s.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    /// Directory the runtime packages are installed into.
    pub cache_dir: PathBuf,
    /// Append-only setup log.
    pub log_file: PathBuf,
    /// Single-instance lock file.
    pub lock_file: PathBuf,
    pub variants: VariantTable,
    /// Package names handed to the package tool.
    pub packages: Vec<String>,
    /// Subdirectory of the cache whose presence proves a populated install.
    pub runtime_package_dir: String,
    pub interpreter_version: InterpreterVersion,
    /// Interpreter used by the last-resort acquisition strategy.
    pub host_interpreter: Option<PathBuf>,
    /// Running as an installed/bundled executable.
    pub packaged: bool,
    pub acquisition_order: Vec<StrategyKind>,
    pub probe_timeout: Duration,
    pub watchdog_interval: Duration,
    pub preload: PreloadPolicy,
    /// Extra accelerator toolkit roots searched before the standard ones.
    pub toolkit_overrides: Vec<PathBuf>,
    /// Directory the packaged executable extracted its bundled files into.
    pub bundle_dir: Option<PathBuf>,
    /// Environment variables applied while preparing the process.
    pub runtime_env: Vec<(String, String)>,
}

impl BootstrapConfig {
    /// Configuration with built-in defaults for the given locations.
    pub fn new(cache_dir: PathBuf, log_file: PathBuf, lock_file: PathBuf) -> Self {
        let runtime_env = if cfg!(windows) {
            vec![("KMP_DUPLICATE_LIB_OK".to_string(), "TRUE".to_string())]
        } else {
            Vec::new()
        };

        Self {
            cache_dir,
            log_file,
            lock_file,
            variants: VariantTable::default(),
            packages: vec!["torch".to_string(), "torchaudio".to_string()],
            runtime_package_dir: "torch".to_string(),
            interpreter_version: InterpreterVersion::build_default(),
            host_interpreter: None,
            packaged: true,
            acquisition_order: StrategyKind::default_order().to_vec(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            watchdog_interval: DEFAULT_WATCHDOG_INTERVAL,
            preload: PreloadPolicy::default(),
            toolkit_overrides: Vec::new(),
            bundle_dir: None,
            runtime_env,
        }
    }

    /// Build the configuration from platform defaults and `NOISES_*` overrides.
    ///
    /// Malformed optional overrides are logged and ignored; only failures to
    /// resolve the base paths are errors.
    pub fn from_env() -> Result<Self, PathError> {
        let mut config = Self::new(cache_root()?, log_file_path()?, lock_file_path());

        config.packaged = match env_value("NOISES_PACKAGED") {
            Some(raw) => parse_flag(&raw).unwrap_or_else(|| {
                warn!(value = %raw, "ignoring invalid NOISES_PACKAGED");
                is_packaged_executable()
            }),
            None => is_packaged_executable(),
        };

        if let Some(raw) = env_value("NOISES_PYTHON_ABI") {
            match raw.parse() {
                Ok(version) => config.interpreter_version = version,
                Err(e) => warn!(error = %e, "ignoring invalid NOISES_PYTHON_ABI"),
            }
        }

        config.host_interpreter = env_value("NOISES_PYTHON").map(PathBuf::from);

        if let Some(raw) = env_value("NOISES_ACQUISITION_ORDER") {
            match parse_acquisition_order(&raw) {
                Ok(order) => config.acquisition_order = order,
                Err(e) => warn!(error = %e, "ignoring invalid NOISES_ACQUISITION_ORDER"),
            }
        }

        config.toolkit_overrides = toolkit_overrides_from_env();
        config.bundle_dir = env_value("NOISES_BUNDLE_DIR").map(PathBuf::from);

        Ok(config)
    }

    /// Strategy order after applying context restrictions: the direct
    /// strategy needs a development environment.
    pub fn effective_acquisition_order(&self) -> Vec<StrategyKind> {
        self.acquisition_order
            .iter()
            .copied()
            .filter(|kind| !(self.packaged && *kind == StrategyKind::Direct))
            .collect()
    }

    /// Root of the runtime package inside the cache.
    pub fn runtime_root(&self) -> PathBuf {
        self.cache_dir.join(&self.runtime_package_dir)
    }

    /// Directory holding the runtime's native libraries.
    pub fn runtime_lib_dir(&self) -> PathBuf {
        self.runtime_root().join("lib")
    }
}

/// Parse a comma-separated strategy list such as `matching,host`.
///
/// Duplicates are dropped, keeping the first occurrence.
pub fn parse_acquisition_order(raw: &str) -> Result<Vec<StrategyKind>, String> {
    let mut order = Vec::new();
    for part in raw.split(',').filter(|part| !part.trim().is_empty()) {
        let kind: StrategyKind = part.parse()?;
        if !order.contains(&kind) {
            order.push(kind);
        }
    }
    if order.is_empty() {
        return Err("acquisition order is empty".to_string());
    }
    Ok(order)
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_value(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn toolkit_overrides_from_env() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(cuda_path) = env::var_os("CUDA_PATH").filter(|v| !v.is_empty()) {
        dirs.push(PathBuf::from(cuda_path));
    }
    if let Some(list) = env::var_os("NOISES_TOOLKIT_DIRS") {
        dirs.extend(env::split_paths(&list).filter(|p| !p.as_os_str().is_empty()));
    }
    dirs
}
