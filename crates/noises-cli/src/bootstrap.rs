//! CLI bootstrap - the composition root.
//!
//! The only place where concrete adapters are wired together: the
//! `nvidia-smi` probe, the acquisition strategies, the platform loader and
//! the process environment. Handlers receive the composed [`CliContext`].

use std::sync::Arc;

use noises_core::ports::{CapabilityProbePort, NativeLoader, RuntimeImportCheck};
use noises_core::{BootstrapConfig, env_file_path};
use noises_runtime::environment::ProcessEnvironment;
use noises_runtime::install::ProgressReporter;
use noises_runtime::{
    EnvironmentPreparer, LaunchActivator, NativeImportCheck, NvidiaSmiProbe, RuntimeInstaller,
    RuntimePreparer, default_strategies, platform_loader,
};

/// Fully composed context for CLI commands.
pub struct CliContext {
    pub config: Arc<BootstrapConfig>,
    pub probe: Arc<dyn CapabilityProbePort>,
    pub loader: Arc<dyn NativeLoader>,
    pub preparer: Arc<dyn RuntimePreparer>,
    pub import_check: Arc<dyn RuntimeImportCheck>,
}

impl CliContext {
    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    /// Installer reporting through `progress`.
    pub fn installer(&self, progress: Arc<dyn ProgressReporter>) -> RuntimeInstaller {
        RuntimeInstaller::new(
            Arc::clone(&self.config),
            Arc::clone(&self.probe),
            default_strategies(&self.config),
            Arc::clone(&self.preparer),
            Arc::clone(&self.import_check),
        )
        .with_progress(progress)
    }

    /// Launch activator with an inline installer for first-launch recovery.
    pub fn activator(&self, progress: Arc<dyn ProgressReporter>) -> LaunchActivator {
        LaunchActivator::new(
            Arc::clone(&self.config),
            Arc::clone(&self.import_check),
            Arc::clone(&self.preparer),
            Arc::new(self.installer(progress)),
        )
    }
}

/// Compose the CLI context from the startup configuration.
pub fn bootstrap(config: BootstrapConfig) -> CliContext {
    let config = Arc::new(config);
    let loader = platform_loader();

    let preparer: Arc<dyn RuntimePreparer> = Arc::new(EnvironmentPreparer::new(
        Arc::clone(&config),
        Arc::clone(&loader),
        Arc::new(ProcessEnvironment),
    ));
    let import_check: Arc<dyn RuntimeImportCheck> = Arc::new(NativeImportCheck::new(
        Arc::clone(&loader),
        config.preload.clone(),
        config.runtime_package_dir.clone(),
    ));

    CliContext {
        probe: Arc::new(NvidiaSmiProbe::new(config.probe_timeout)),
        config,
        loader,
        preparer,
        import_check,
    }
}

/// Load `.env` from the data root, then from the working directory.
///
/// Variables already set in the process environment win.
pub fn load_env_files() {
    if let Ok(path) = env_file_path() {
        dotenvy::from_path(path).ok();
    }
    dotenvy::dotenv().ok();
}
