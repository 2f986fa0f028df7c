//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the core domain expects from the
//! runtime crate. They contain no implementation details and use only
//! domain types.
//!
//! # Design Rules
//!
//! - No subprocess or dynamic loader types in any signature
//! - Failures of best-effort operations are data, not panics
//! - Mocks are generated for every port behind the `test-utils` feature

pub mod acquisition;
pub mod capability_probe;
pub mod native_loader;
pub mod runtime_check;

pub use acquisition::{
    AcquisitionError, AcquisitionRequest, AcquisitionStrategy, StrategyKind,
    manual_install_command,
};
pub use capability_probe::{CapabilityProbePort, ProbeError, probe_or_absent};
pub use native_loader::{LoaderError, NativeLoader};
pub use runtime_check::{ImportStatus, RuntimeImportCheck};

#[cfg(any(test, feature = "test-utils"))]
pub use acquisition::MockAcquisitionStrategy;
#[cfg(any(test, feature = "test-utils"))]
pub use capability_probe::MockCapabilityProbePort;
#[cfg(any(test, feature = "test-utils"))]
pub use native_loader::MockNativeLoader;
#[cfg(any(test, feature = "test-utils"))]
pub use runtime_check::MockRuntimeImportCheck;
