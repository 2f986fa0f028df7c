//! The three acquisition strategies.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use noises_core::ports::{AcquisitionError, AcquisitionRequest, AcquisitionStrategy, StrategyKind};
use noises_core::{BootstrapConfig, InterpreterVersion};

use super::command::{ToolCommand, run_package_install};
use super::interpreter::{find_matching_interpreter, resolve_candidates, sibling_package_tool};

/// Invoke the development environment's package tool directly.
#[derive(Debug, Clone)]
pub struct DirectStrategy {
    host_interpreter: Option<PathBuf>,
}

impl DirectStrategy {
    pub const fn new(host_interpreter: Option<PathBuf>) -> Self {
        Self { host_interpreter }
    }

    fn locate_tool(&self) -> Option<PathBuf> {
        self.host_interpreter
            .as_deref()
            .and_then(sibling_package_tool)
            .or_else(|| which::which("pip3").ok())
            .or_else(|| which::which("pip").ok())
    }
}

#[async_trait]
impl AcquisitionStrategy for DirectStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Direct
    }

    async fn acquire(&self, request: &AcquisitionRequest) -> Result<(), AcquisitionError> {
        let tool = self
            .locate_tool()
            .ok_or_else(|| AcquisitionError::Unavailable("no package tool on PATH".to_string()))?;
        run_package_install(&ToolCommand::new(tool), request).await
    }
}

/// Use an external interpreter whose ABI matches this build.
#[derive(Debug, Clone)]
pub struct MatchingInterpreterStrategy {
    version: InterpreterVersion,
    query_timeout: Duration,
}

impl MatchingInterpreterStrategy {
    pub const fn new(version: InterpreterVersion, query_timeout: Duration) -> Self {
        Self {
            version,
            query_timeout,
        }
    }
}

#[async_trait]
impl AcquisitionStrategy for MatchingInterpreterStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Matching
    }

    async fn acquire(&self, request: &AcquisitionRequest) -> Result<(), AcquisitionError> {
        let candidates = resolve_candidates(self.version);
        let interpreter = find_matching_interpreter(&candidates, self.version, self.query_timeout)
            .await
            .ok_or_else(|| {
                AcquisitionError::Unavailable(format!(
                    "no interpreter {} with a package tool found",
                    self.version
                ))
            })?;

        let tool = interpreter.clone().with_leading_args(
            interpreter
                .leading_args
                .iter()
                .cloned()
                .chain(["-m".to_string(), "pip".to_string()]),
        );
        run_package_install(&tool, request).await
    }
}

/// Last resort: the configured host interpreter's package module.
#[derive(Debug, Clone)]
pub struct HostInterpreterStrategy {
    interpreter: Option<PathBuf>,
}

impl HostInterpreterStrategy {
    pub const fn new(interpreter: Option<PathBuf>) -> Self {
        Self { interpreter }
    }
}

#[async_trait]
impl AcquisitionStrategy for HostInterpreterStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Host
    }

    async fn acquire(&self, request: &AcquisitionRequest) -> Result<(), AcquisitionError> {
        let interpreter = self.interpreter.clone().ok_or_else(|| {
            AcquisitionError::Unavailable(
                "no host interpreter configured (set NOISES_PYTHON)".to_string(),
            )
        })?;
        let tool = ToolCommand::new(interpreter).with_leading_args(["-m", "pip"]);
        run_package_install(&tool, request).await
    }
}

/// One instance of every strategy, built from configuration.
pub fn default_strategies(config: &BootstrapConfig) -> Vec<Arc<dyn AcquisitionStrategy>> {
    vec![
        Arc::new(DirectStrategy::new(config.host_interpreter.clone())),
        Arc::new(MatchingInterpreterStrategy::new(
            config.interpreter_version,
            config.probe_timeout,
        )),
        Arc::new(HostInterpreterStrategy::new(config.host_interpreter.clone())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use noises_core::VariantDescriptor;

    fn request() -> AcquisitionRequest {
        AcquisitionRequest {
            variant: VariantDescriptor::from_index(12, 4, "cu124"),
            target_dir: PathBuf::from("/tmp/noises-test-cache"),
            packages: vec!["torch".to_string()],
        }
    }

    #[test]
    fn default_strategies_cover_every_kind() {
        let config = BootstrapConfig::new("/c".into(), "/l".into(), "/k".into());
        let kinds: Vec<StrategyKind> = default_strategies(&config)
            .iter()
            .map(|s| s.kind())
            .collect();
        assert_eq!(kinds, StrategyKind::default_order());
    }

    #[tokio::test]
    async fn host_strategy_without_interpreter_is_unavailable() {
        let strategy = HostInterpreterStrategy::new(None);
        assert!(matches!(
            strategy.acquire(&request()).await,
            Err(AcquisitionError::Unavailable(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn host_strategy_runs_interpreter_package_module() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let record = dir.path().join("args.txt");
        let interpreter = dir.path().join("python");
        fs::write(
            &interpreter,
            format!("#!/bin/sh\necho \"$@\" > '{}'\n", record.display()),
        )
        .unwrap();
        fs::set_permissions(&interpreter, fs::Permissions::from_mode(0o755)).unwrap();

        HostInterpreterStrategy::new(Some(interpreter))
            .acquire(&request())
            .await
            .unwrap();

        let args = fs::read_to_string(&record).unwrap();
        assert!(args.starts_with("-m pip install --target /tmp/noises-test-cache"));
        assert!(args.trim_end().ends_with("--no-warn-conflicts torch"));
    }
}
