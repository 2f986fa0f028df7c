//! Process-level adapters for the Noises runtime bootstrap.
//!
//! Implements the ports of `noises-core` against the real system: the
//! accelerator probe, acquisition strategies, the native loader and
//! environment preparer, plus launch activation and process supervision.

#![deny(unsafe_code)]

pub mod activate;
pub mod environment;
pub mod import_check;
pub mod install;
pub mod logging;
pub mod probe;
pub mod supervisor;

pub use activate::LaunchActivator;
pub use environment::{
    DynamicLoader, EnvironmentPreparer, PreparationReport, ProcessEnvironment, RuntimePreparer,
    platform_loader,
};
pub use import_check::NativeImportCheck;
pub use install::{Install, NoopProgress, ProgressReporter, RuntimeInstaller, default_strategies};
#[cfg(feature = "cli")]
pub use install::CliProgress;
pub use logging::init_logging;
pub use probe::{NvidiaSmiProbe, ToolLocator};
pub use supervisor::{LockGuard, LockOutcome, ShutdownHandle, SupervisorError};
