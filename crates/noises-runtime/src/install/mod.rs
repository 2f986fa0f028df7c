//! One-time runtime installation.
//!
//! `ensure_installed` is idempotent: a valid cache short-circuits before any
//! probing or acquisition. Otherwise it probes the accelerator, resolves the
//! runtime variant, discards any partial install, acquires the packages via
//! the configured strategy chain, writes the completion markers and verifies
//! the result can be loaded.

pub mod command;
pub mod interpreter;
pub mod progress;
pub mod strategies;

use std::fs;
use std::sync::Arc;

use async_trait::async_trait;
use noises_core::domain::{discard_partial, mark_complete};
use noises_core::ports::{
    AcquisitionRequest, AcquisitionStrategy, CapabilityProbePort, ImportStatus,
    RuntimeImportCheck, probe_or_absent,
};
use noises_core::{
    BootstrapConfig, BootstrapError, InstallOutcome, InstallationState, VariantDescriptor,
};
use tracing::{error, info, warn};

use crate::environment::RuntimePreparer;

pub use progress::{NoopProgress, ProgressReporter};
#[cfg(feature = "cli")]
pub use progress::CliProgress;
pub use strategies::{
    DirectStrategy, HostInterpreterStrategy, MatchingInterpreterStrategy, default_strategies,
};

/// Anything that can make sure the runtime cache is installed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Install: Send + Sync {
    async fn ensure_installed(&self) -> Result<InstallOutcome, BootstrapError>;
}

pub struct RuntimeInstaller {
    config: Arc<BootstrapConfig>,
    probe: Arc<dyn CapabilityProbePort>,
    strategies: Vec<Arc<dyn AcquisitionStrategy>>,
    preparer: Arc<dyn RuntimePreparer>,
    import_check: Arc<dyn RuntimeImportCheck>,
    progress: Arc<dyn ProgressReporter>,
}

impl RuntimeInstaller {
    pub fn new(
        config: Arc<BootstrapConfig>,
        probe: Arc<dyn CapabilityProbePort>,
        strategies: Vec<Arc<dyn AcquisitionStrategy>>,
        preparer: Arc<dyn RuntimePreparer>,
        import_check: Arc<dyn RuntimeImportCheck>,
    ) -> Self {
        Self {
            config,
            probe,
            strategies,
            preparer,
            import_check,
            progress: Arc::new(NoopProgress),
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Strategies in effective policy order.
    fn ordered_strategies(&self) -> Vec<Arc<dyn AcquisitionStrategy>> {
        self.config
            .effective_acquisition_order()
            .into_iter()
            .flat_map(|kind| {
                self.strategies
                    .iter()
                    .filter(move |strategy| strategy.kind() == kind)
                    .cloned()
            })
            .collect()
    }

    async fn select_variant(&self) -> Result<VariantDescriptor, BootstrapError> {
        let report = probe_or_absent(self.probe.as_ref()).await;
        if !report.accelerator_present {
            return Err(BootstrapError::HardwareAbsent);
        }
        info!(
            gpu = report.accelerator_name.as_deref().unwrap_or("unknown"),
            "accelerator detected"
        );

        let oldest_supported = self
            .config
            .variants
            .oldest()
            .map(|variant| variant.min_driver_version);
        let Some(driver) = report.driver_version else {
            return Err(BootstrapError::DriverIncompatible {
                driver: None,
                oldest_supported,
            });
        };
        info!(%driver, "driver toolkit version");

        let variant = self.config.variants.resolve(driver).map_err(|e| {
            BootstrapError::DriverIncompatible {
                driver: Some(e.driver),
                oldest_supported: e.oldest_supported,
            }
        })?;
        info!(variant = %variant.variant_tag, "selected runtime variant");
        Ok(variant.clone())
    }

    async fn acquire(&self, variant: &VariantDescriptor) -> Result<(), BootstrapError> {
        let cache_dir = &self.config.cache_dir;

        if discard_partial(cache_dir)? {
            warn!(cache = %cache_dir.display(), "removed incomplete previous install");
        }
        fs::create_dir_all(cache_dir)?;

        let request = AcquisitionRequest {
            variant: variant.clone(),
            target_dir: cache_dir.clone(),
            packages: self.config.packages.clone(),
        };

        info!(
            variant = %variant.variant_tag,
            destination = %cache_dir.display(),
            index = %variant.package_source_uri,
            "installing runtime; this is a one-time download and may take several minutes"
        );
        self.progress
            .start(&format!("Installing runtime ({})", variant.variant_tag));

        let mut attempts = Vec::new();
        for strategy in self.ordered_strategies() {
            let kind = strategy.kind();
            info!(strategy = %kind, "trying acquisition strategy");
            match strategy.acquire(&request).await {
                Ok(()) => {
                    info!(strategy = %kind, "runtime packages acquired");
                    mark_complete(cache_dir, &variant.variant_tag)?;
                    self.progress
                        .finish(&format!("Installed runtime ({})", variant.variant_tag));
                    self.log_installed_tree();
                    return Ok(());
                }
                Err(e) => {
                    warn!(strategy = %kind, error = %e, "acquisition strategy failed");
                    attempts.push(format!("{kind}: {e}"));
                }
            }
        }

        if attempts.is_empty() {
            attempts.push("no acquisition strategy is enabled".to_string());
        }
        self.progress.finish_with_error("Runtime installation failed");
        Err(BootstrapError::AcquisitionFailed {
            variant: variant.variant_tag.clone(),
            manual_command: request.manual_command(),
            attempts,
        })
    }

    fn log_installed_tree(&self) {
        let Ok(entries) = fs::read_dir(&self.config.cache_dir) else {
            return;
        };
        let mut names: Vec<String> = entries
            .flatten()
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        info!(packages = ?names, "installed top-level directories");
    }

    fn verify(&self) -> Result<(), BootstrapError> {
        info!("verifying installation");
        let cache_dir = &self.config.cache_dir;
        self.preparer.prepare(cache_dir);

        match self.import_check.check(Some(cache_dir)) {
            ImportStatus::Importable {
                accelerated,
                location,
            } => {
                if let Some(location) = location {
                    info!(location = %location.display(), "runtime is loadable");
                }
                if accelerated {
                    info!("accelerated backend available");
                } else {
                    warn!("runtime loaded but the accelerated backend is not available");
                }
                Ok(())
            }
            ImportStatus::NotImportable { reason } => {
                error!(%reason, "installed runtime cannot be loaded");
                Err(BootstrapError::VerificationFailed {
                    reason,
                    cache_dir: cache_dir.clone(),
                    log_file: self.config.log_file.clone(),
                })
            }
        }
    }
}

#[async_trait]
impl Install for RuntimeInstaller {
    async fn ensure_installed(&self) -> Result<InstallOutcome, BootstrapError> {
        let state = InstallationState::read(&self.config.cache_dir, &self.config.runtime_package_dir);
        if state.is_valid() {
            info!(
                variant = state.variant_label(),
                cache = %self.config.cache_dir.display(),
                "runtime already installed; delete the cache directory to force a reinstall"
            );
            return Ok(InstallOutcome::AlreadyInstalled {
                variant: state.variant_label().to_string(),
            });
        }

        info!("starting runtime installation");
        let variant = self.select_variant().await?;
        self.acquire(&variant).await?;
        self.verify()?;

        info!(variant = %variant.variant_tag, "installation complete");
        Ok(InstallOutcome::Installed {
            variant: variant.variant_tag,
        })
    }
}
