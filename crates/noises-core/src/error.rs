//! Terminal bootstrap errors.
//!
//! Every variant's message tells the user what to do next. The binary maps
//! each kind to a distinct exit code.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::DriverVersion;
use crate::paths::PathError;

const DRIVER_DOWNLOAD_URL: &str = "https://www.nvidia.com/drivers/";

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(
        "No NVIDIA GPU detected.\n\
         This application requires an NVIDIA GPU with up-to-date drivers.\n\
         Download drivers: https://www.nvidia.com/drivers/"
    )]
    HardwareAbsent,

    #[error("{}", driver_message(.driver, .oldest_supported))]
    DriverIncompatible {
        driver: Option<DriverVersion>,
        oldest_supported: Option<DriverVersion>,
    },

    #[error(
        "Could not install the {variant} runtime.\n{}\
         Install it manually with:\n  {manual_command}",
        format_attempts(.attempts)
    )]
    AcquisitionFailed {
        variant: String,
        manual_command: String,
        attempts: Vec<String>,
    },

    #[error(
        "The runtime was installed but cannot be loaded: {reason}\n\
         Delete the runtime cache and run setup again:\n  {}\n\
         Details are in the log: {}",
        remove_dir_hint(.cache_dir), .log_file.display()
    )]
    VerificationFailed {
        reason: String,
        cache_dir: PathBuf,
        log_file: PathBuf,
    },

    #[error(
        "The accelerated runtime is unavailable: {reason}\n\
         Check the log at {}\n\
         If the problem persists, delete the runtime cache and reinstall:\n  {}",
        .log_file.display(), remove_dir_hint(.cache_dir)
    )]
    RuntimeUnavailable {
        reason: String,
        cache_dir: PathBuf,
        log_file: PathBuf,
    },

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BootstrapError {
    /// Process exit code for this error kind.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::HardwareAbsent => 3,
            Self::DriverIncompatible { .. } => 4,
            Self::AcquisitionFailed { .. } => 5,
            Self::VerificationFailed { .. } => 6,
            Self::RuntimeUnavailable { .. } => 7,
            Self::Path(_) | Self::Io(_) => 1,
        }
    }

    /// Short machine-readable kind for logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::HardwareAbsent => "hardware_absent",
            Self::DriverIncompatible { .. } => "driver_incompatible",
            Self::AcquisitionFailed { .. } => "acquisition_failed",
            Self::VerificationFailed { .. } => "verification_failed",
            Self::RuntimeUnavailable { .. } => "runtime_unavailable",
            Self::Path(_) => "path",
            Self::Io(_) => "io",
        }
    }
}

fn driver_message(driver: &Option<DriverVersion>, oldest: &Option<DriverVersion>) -> String {
    match (*driver, *oldest) {
        (None, _) => format!(
            "Could not detect the NVIDIA driver version.\n\
             Please update your NVIDIA drivers: {DRIVER_DOWNLOAD_URL}"
        ),
        (Some(driver), Some(oldest)) => format!(
            "Your NVIDIA driver supports CUDA {driver}, but at least CUDA {oldest} is required.\n\
             Please update your NVIDIA drivers: {DRIVER_DOWNLOAD_URL}"
        ),
        (Some(driver), None) => format!(
            "No runtime build supports your NVIDIA driver (CUDA {driver}).\n\
             Please update your NVIDIA drivers: {DRIVER_DOWNLOAD_URL}"
        ),
    }
}

fn format_attempts(attempts: &[String]) -> String {
    attempts
        .iter()
        .map(|attempt| format!("  - {attempt}\n"))
        .collect()
}

/// Shell command that deletes `dir` on this platform.
pub fn remove_dir_hint(dir: &Path) -> String {
    if cfg!(windows) {
        format!("rmdir /s /q \"{}\"", dir.display())
    } else {
        format!("rm -rf \"{}\"", dir.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct_per_terminal_kind() {
        let errors = [
            BootstrapError::HardwareAbsent,
            BootstrapError::DriverIncompatible {
                driver: None,
                oldest_supported: None,
            },
            BootstrapError::AcquisitionFailed {
                variant: "cu124".into(),
                manual_command: String::new(),
                attempts: vec![],
            },
            BootstrapError::VerificationFailed {
                reason: String::new(),
                cache_dir: PathBuf::new(),
                log_file: PathBuf::new(),
            },
            BootstrapError::RuntimeUnavailable {
                reason: String::new(),
                cache_dir: PathBuf::new(),
                log_file: PathBuf::new(),
            },
        ];
        let codes: Vec<i32> = errors.iter().map(BootstrapError::exit_code).collect();
        assert_eq!(codes, [3, 4, 5, 6, 7]);
    }

    #[test]
    fn driver_message_names_both_versions() {
        let err = BootstrapError::DriverIncompatible {
            driver: Some(DriverVersion::new(11, 0)),
            oldest_supported: Some(DriverVersion::new(11, 8)),
        };
        let message = err.to_string();
        assert!(message.contains("CUDA 11.0"));
        assert!(message.contains("at least CUDA 11.8"));
        assert!(message.contains(DRIVER_DOWNLOAD_URL));
    }

    #[test]
    fn acquisition_failure_lists_attempts_and_manual_command() {
        let err = BootstrapError::AcquisitionFailed {
            variant: "cu124".into(),
            manual_command: "pip install torch --index-url https://x/cu124".into(),
            attempts: vec!["direct: not eligible".into(), "host: exit status 1".into()],
        };
        let message = err.to_string();
        assert!(message.contains("  - direct: not eligible\n"));
        assert!(message.contains("  - host: exit status 1\n"));
        assert!(message.ends_with("pip install torch --index-url https://x/cu124"));
    }

    #[test]
    fn runtime_unavailable_points_to_log_and_cache() {
        let err = BootstrapError::RuntimeUnavailable {
            reason: "bridge failed to load".into(),
            cache_dir: PathBuf::from("/cache/runtime"),
            log_file: PathBuf::from("/data/setup.log"),
        };
        let message = err.to_string();
        assert!(message.contains("/data/setup.log"));
        assert!(message.contains("/cache/runtime"));
        assert_eq!(err.kind(), "runtime_unavailable");
    }
}
