//! Core domain, configuration and ports for the Noises runtime bootstrap.
//!
//! This crate decides *what* to do: which runtime variant fits the detected
//! driver, whether the on-disk cache is usable, in which order directories
//! are searched and libraries preloaded. The `noises-runtime` crate decides
//! *how*, by implementing the ports defined here.

#![deny(unused_crate_dependencies)]

pub mod config;
pub mod domain;
pub mod error;
pub mod paths;
pub mod ports;

pub use config::{BootstrapConfig, InterpreterVersion, parse_acquisition_order};
pub use domain::{
    CapabilityReport, DriverVersion, InstallOutcome, InstallationState, LibrarySearchPlan,
    LoadReport, NotSupported, PreloadPlan, PreloadPolicy, Readiness, VariantDescriptor,
    VariantTable,
};
pub use error::{BootstrapError, remove_dir_hint};
pub use paths::{
    PathError, ResolvedPaths, cache_root, data_root, env_file_path, is_packaged_executable,
    lock_file_path, log_file_path,
};
pub use ports::{
    AcquisitionError, AcquisitionRequest, AcquisitionStrategy, CapabilityProbePort, ImportStatus,
    LoaderError, NativeLoader, ProbeError, RuntimeImportCheck, StrategyKind,
};

// Dev-dependency used only by integration tests
#[cfg(test)]
use serde_json as _;
