//! Capability probe port for accelerator detection.
//!
//! Core owns the trait and error type; the runtime crate owns the
//! implementation that spawns the vendor diagnostic tool.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::CapabilityReport;

/// Why a probe could not produce a report.
///
/// Never surfaced to the user: every variant degrades to "no accelerator".
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("{tool} not found")]
    ToolNotFound { tool: String },

    #[error("{tool} did not respond within {after:?}")]
    Timeout { tool: String, after: Duration },

    #[error("Failed to start {tool}: {reason}")]
    SpawnFailed { tool: String, reason: String },

    #[error("{tool} exited with {status}")]
    NonZeroExit { tool: String, status: String },

    #[error("{tool} produced no output")]
    EmptyOutput { tool: String },
}

/// Port for detecting accelerator hardware and driver capability.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait CapabilityProbePort: Send + Sync {
    /// Run the probe, reporting why it failed.
    async fn try_probe(&self) -> Result<CapabilityReport, ProbeError>;
}

/// Probe and degrade any failure to [`CapabilityReport::absent`].
pub async fn probe_or_absent(probe: &dyn CapabilityProbePort) -> CapabilityReport {
    match probe.try_probe().await {
        Ok(report) => report,
        Err(e) => {
            tracing::debug!(error = %e, "capability probe failed; treating accelerator as absent");
            CapabilityReport::absent()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DriverVersion;

    #[tokio::test]
    async fn probe_failure_degrades_to_absent() {
        let mut probe = MockCapabilityProbePort::new();
        probe.expect_try_probe().returning(|| {
            Err(ProbeError::ToolNotFound {
                tool: "nvidia-smi".to_string(),
            })
        });

        assert_eq!(probe_or_absent(&probe).await, CapabilityReport::absent());
    }

    #[tokio::test]
    async fn successful_probe_passes_through() {
        let mut probe = MockCapabilityProbePort::new();
        probe.expect_try_probe().times(1).returning(|| {
            Ok(CapabilityReport::present(
                "NVIDIA GeForce RTX 3080",
                Some(DriverVersion::new(12, 4)),
            ))
        });

        let report = probe_or_absent(&probe).await;
        assert!(report.accelerator_present);
        assert_eq!(report.driver_version, Some(DriverVersion::new(12, 4)));
    }
}
