//! Accelerator capability probing via the vendor diagnostic tool.
//!
//! Implements the `CapabilityProbePort` contract from `noises-core`. Two
//! invocations are made, each bounded by the configured timeout:
//! - `--query-gpu=name --format=csv,noheader` for the device name
//! - the plain status banner for the supported toolkit version

mod locate;
mod parse;

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use noises_core::ports::{CapabilityProbePort, ProbeError};
use noises_core::CapabilityReport;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

pub use locate::ToolLocator;
pub use parse::{parse_device_name, parse_driver_version};

const TOOL_NAME: &str = "nvidia-smi";

/// Where the probe gets its executable from.
#[derive(Debug, Clone)]
enum ToolSource {
    Fixed(PathBuf),
    Search(ToolLocator),
}

/// Probe backed by `nvidia-smi`.
#[derive(Debug, Clone)]
pub struct NvidiaSmiProbe {
    source: ToolSource,
    timeout: Duration,
}

impl NvidiaSmiProbe {
    /// Locate the tool on every probe using the standard search order.
    pub fn new(timeout: Duration) -> Self {
        Self::with_locator(ToolLocator::system(), timeout)
    }

    /// Locate the tool on every probe using `locator`.
    pub const fn with_locator(locator: ToolLocator, timeout: Duration) -> Self {
        Self {
            source: ToolSource::Search(locator),
            timeout,
        }
    }

    /// Use a specific executable instead of searching for one.
    pub fn with_tool(tool_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            source: ToolSource::Fixed(tool_path.into()),
            timeout,
        }
    }

    fn resolve_tool(&self) -> Result<PathBuf, ProbeError> {
        let found = match &self.source {
            ToolSource::Fixed(path) => Some(path.clone()).filter(|path| path.is_file()),
            ToolSource::Search(locator) => locator.locate(),
        };
        found.ok_or_else(|| ProbeError::ToolNotFound {
            tool: TOOL_NAME.to_string(),
        })
    }

    async fn run(&self, tool: &Path, args: &[&str]) -> Result<String, ProbeError> {
        let mut cmd = Command::new(tool);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| ProbeError::Timeout {
                tool: TOOL_NAME.to_string(),
                after: self.timeout,
            })?
            .map_err(|e| ProbeError::SpawnFailed {
                tool: TOOL_NAME.to_string(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(ProbeError::NonZeroExit {
                tool: TOOL_NAME.to_string(),
                status: output.status.to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if stdout.trim().is_empty() {
            return Err(ProbeError::EmptyOutput {
                tool: TOOL_NAME.to_string(),
            });
        }
        Ok(stdout)
    }
}

#[async_trait]
impl CapabilityProbePort for NvidiaSmiProbe {
    async fn try_probe(&self) -> Result<CapabilityReport, ProbeError> {
        let tool = self.resolve_tool()?;
        debug!(tool = %tool.display(), "probing accelerator");

        let names = self
            .run(&tool, &["--query-gpu=name", "--format=csv,noheader"])
            .await?;
        let name = parse_device_name(&names).ok_or_else(|| ProbeError::EmptyOutput {
            tool: TOOL_NAME.to_string(),
        })?;

        let driver_version = match self.run(&tool, &[]).await {
            Ok(banner) => parse_driver_version(&banner),
            Err(e) => {
                warn!(error = %e, "could not read driver status banner");
                None
            }
        };

        debug!(name = %name, driver = ?driver_version, "accelerator detected");
        Ok(CapabilityReport::present(name, driver_version))
    }
}
