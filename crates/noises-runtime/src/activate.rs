//! Launch-time activation.
//!
//! Runs on every start of the backend. No probing, network access or
//! package tooling happens here unless the cache is missing, in which case
//! the installer runs inline as a first-launch recovery.

use std::sync::Arc;

use noises_core::ports::{ImportStatus, RuntimeImportCheck, manual_install_command};
use noises_core::{BootstrapConfig, BootstrapError, InstallationState, Readiness};
use tracing::{error, info, warn};

use crate::environment::RuntimePreparer;
use crate::install::Install;

/// Label reported when the runtime was importable before any preparation.
pub const PREINSTALLED_VARIANT: &str = "preinstalled";

pub struct LaunchActivator {
    config: Arc<BootstrapConfig>,
    import_check: Arc<dyn RuntimeImportCheck>,
    preparer: Arc<dyn RuntimePreparer>,
    installer: Arc<dyn Install>,
}

impl LaunchActivator {
    pub fn new(
        config: Arc<BootstrapConfig>,
        import_check: Arc<dyn RuntimeImportCheck>,
        preparer: Arc<dyn RuntimePreparer>,
        installer: Arc<dyn Install>,
    ) -> Self {
        Self {
            config,
            import_check,
            preparer,
            installer,
        }
    }

    /// Make the accelerated runtime importable in this process.
    pub async fn activate(&self) -> Result<Readiness, BootstrapError> {
        if let Some(readiness) = self.check_preinstalled() {
            return Ok(readiness);
        }

        let cache_dir = &self.config.cache_dir;
        let state = InstallationState::read(cache_dir, &self.config.runtime_package_dir);
        if !state.is_valid() {
            warn!(
                cache = %cache_dir.display(),
                "runtime cache not found; running first-time setup (one-time download)"
            );
            if let Err(e) = self.installer.ensure_installed().await {
                error!(kind = e.kind(), error = %e, "first-launch setup failed");
                return Err(self.unavailable(format!("automatic setup failed: {e}")));
            }
        }

        self.preparer.prepare(cache_dir);

        match self.import_check.check(Some(cache_dir)) {
            ImportStatus::Importable { accelerated, .. } => {
                let state = InstallationState::read(cache_dir, &self.config.runtime_package_dir);
                let variant = state.variant_label().to_string();
                if !accelerated {
                    warn!(%variant, "runtime loaded from cache without its accelerated backend");
                }
                info!(%variant, "runtime ready");
                Ok(Readiness::Ready { variant })
            }
            ImportStatus::NotImportable { reason } => {
                error!(%reason, "runtime cache exists but cannot be loaded");
                Err(self.unavailable(format!("cannot load the cached runtime: {reason}")))
            }
        }
    }

    /// Runtime already importable without the cache, as in a development
    /// environment. Packaged builds only accept an accelerated runtime here.
    fn check_preinstalled(&self) -> Option<Readiness> {
        let ImportStatus::Importable { accelerated, .. } = self.import_check.check(None) else {
            return None;
        };

        if accelerated {
            info!("runtime ready (accelerated, preinstalled)");
            return Some(Readiness::Ready {
                variant: PREINSTALLED_VARIANT.to_string(),
            });
        }

        if self.config.packaged {
            warn!("preinstalled runtime lacks acceleration; using the runtime cache");
            return None;
        }

        let fix = self.config.variants.newest().map_or_else(String::new, |newest| {
            manual_install_command(&self.config.packages, newest)
        });
        warn!(%fix, "development environment has a runtime without acceleration");
        Some(Readiness::ReadyWithoutAcceleration)
    }

    fn unavailable(&self, reason: String) -> BootstrapError {
        BootstrapError::RuntimeUnavailable {
            reason,
            cache_dir: self.config.cache_dir.clone(),
            log_file: self.config.log_file.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{MockRuntimePreparer, PreparationReport};
    use crate::install::MockInstall;
    use mockall::Sequence;
    use noises_core::InstallOutcome;
    use noises_core::domain::mark_complete;
    use noises_core::ports::MockRuntimeImportCheck;
    use std::fs;
    use tempfile::TempDir;

    fn config(temp: &TempDir, packaged: bool) -> BootstrapConfig {
        let mut config = BootstrapConfig::new(
            temp.path().join("runtime"),
            temp.path().join("setup.log"),
            temp.path().join("noises.lock"),
        );
        config.packaged = packaged;
        config
    }

    fn populate(config: &BootstrapConfig, tag: &str) {
        fs::create_dir_all(config.runtime_lib_dir()).unwrap();
        mark_complete(&config.cache_dir, tag).unwrap();
    }

    fn importable(accelerated: bool) -> ImportStatus {
        ImportStatus::Importable {
            accelerated,
            location: None,
        }
    }

    fn not_importable() -> ImportStatus {
        ImportStatus::NotImportable {
            reason: "library not found".to_string(),
        }
    }

    fn preparer(times: usize) -> MockRuntimePreparer {
        let mut preparer = MockRuntimePreparer::new();
        preparer
            .expect_prepare()
            .times(times)
            .returning(|_| PreparationReport::default());
        preparer
    }

    fn no_install() -> MockInstall {
        let mut installer = MockInstall::new();
        installer.expect_ensure_installed().never();
        installer
    }

    fn activator(
        config: BootstrapConfig,
        check: MockRuntimeImportCheck,
        preparer: MockRuntimePreparer,
        installer: MockInstall,
    ) -> LaunchActivator {
        LaunchActivator::new(
            Arc::new(config),
            Arc::new(check),
            Arc::new(preparer),
            Arc::new(installer),
        )
    }

    #[tokio::test]
    async fn accelerated_preinstalled_runtime_is_ready_immediately() {
        let temp = TempDir::new().unwrap();
        let mut check = MockRuntimeImportCheck::new();
        check
            .expect_check()
            .withf(|cache| cache.is_none())
            .times(1)
            .returning(|_| importable(true));

        let readiness = activator(config(&temp, true), check, preparer(0), no_install())
            .activate()
            .await
            .unwrap();
        assert_eq!(
            readiness,
            Readiness::Ready {
                variant: PREINSTALLED_VARIANT.to_string()
            }
        );
    }

    #[tokio::test]
    async fn development_without_acceleration_warns_and_continues() {
        let temp = TempDir::new().unwrap();
        let mut check = MockRuntimeImportCheck::new();
        check.expect_check().times(1).returning(|_| importable(false));

        let readiness = activator(config(&temp, false), check, preparer(0), no_install())
            .activate()
            .await
            .unwrap();
        assert_eq!(readiness, Readiness::ReadyWithoutAcceleration);
    }

    #[tokio::test]
    async fn packaged_without_acceleration_uses_cache() {
        let temp = TempDir::new().unwrap();
        let config = config(&temp, true);
        populate(&config, "cu126");

        let mut seq = Sequence::new();
        let mut check = MockRuntimeImportCheck::new();
        check
            .expect_check()
            .withf(|cache| cache.is_none())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| importable(false));
        check
            .expect_check()
            .withf(|cache| cache.is_some())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| importable(true));

        let readiness = activator(config, check, preparer(1), no_install())
            .activate()
            .await
            .unwrap();
        assert_eq!(
            readiness,
            Readiness::Ready {
                variant: "cu126".to_string()
            }
        );
    }

    #[tokio::test]
    async fn missing_cache_runs_installer_inline() {
        let temp = TempDir::new().unwrap();
        let config = config(&temp, true);
        let cache_config = config.clone();

        let mut check = MockRuntimeImportCheck::new();
        check
            .expect_check()
            .returning(|cache| if cache.is_some() { importable(true) } else { not_importable() });

        let mut installer = MockInstall::new();
        installer.expect_ensure_installed().times(1).returning(move || {
            populate(&cache_config, "cu128");
            Ok(InstallOutcome::Installed {
                variant: "cu128".to_string(),
            })
        });

        let readiness = activator(config, check, preparer(1), installer)
            .activate()
            .await
            .unwrap();
        assert_eq!(
            readiness,
            Readiness::Ready {
                variant: "cu128".to_string()
            }
        );
    }

    #[tokio::test]
    async fn installer_failure_becomes_runtime_unavailable() {
        let temp = TempDir::new().unwrap();
        let mut check = MockRuntimeImportCheck::new();
        check.expect_check().returning(|_| not_importable());

        let mut installer = MockInstall::new();
        installer
            .expect_ensure_installed()
            .returning(|| Err(BootstrapError::HardwareAbsent));

        let err = activator(config(&temp, true), check, preparer(0), installer)
            .activate()
            .await
            .unwrap_err();

        assert_eq!(err.exit_code(), 7);
        let message = err.to_string();
        assert!(message.contains("No NVIDIA GPU detected"));
        assert!(message.contains("setup.log"));
    }

    #[tokio::test]
    async fn unloadable_cache_becomes_runtime_unavailable() {
        let temp = TempDir::new().unwrap();
        let config = config(&temp, true);
        populate(&config, "cu124");

        let mut check = MockRuntimeImportCheck::new();
        check.expect_check().returning(|_| not_importable());

        let err = activator(config, check, preparer(1), no_install())
            .activate()
            .await
            .unwrap_err();
        assert!(matches!(err, BootstrapError::RuntimeUnavailable { .. }));
        assert!(err.to_string().contains("library not found"));
    }
}
