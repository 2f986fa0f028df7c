//! Acquisition strategy port.
//!
//! A strategy is one way of fetching the runtime packages into the cache
//! directory. The installer tries strategies in configured order until one
//! succeeds.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::VariantDescriptor;

/// Identifies an acquisition strategy in configuration and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Package tool from the development environment, invoked directly.
    Direct,
    /// External interpreter matching the targeted ABI.
    Matching,
    /// The configured host interpreter.
    Host,
}

impl StrategyKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Matching => "matching",
            Self::Host => "host",
        }
    }

    /// Default policy order.
    pub const fn default_order() -> [Self; 3] {
        [Self::Direct, Self::Matching, Self::Host]
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "matching" => Ok(Self::Matching),
            "host" => Ok(Self::Host),
            other => Err(format!(
                "unknown acquisition strategy '{other}' (expected direct, matching or host)"
            )),
        }
    }
}

/// What to acquire and where to put it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionRequest {
    pub variant: VariantDescriptor,
    pub target_dir: PathBuf,
    pub packages: Vec<String>,
}

impl AcquisitionRequest {
    /// Arguments for the package tool's install subcommand.
    pub fn installer_args(&self) -> Vec<String> {
        let mut args = vec![
            "install".to_string(),
            "--target".to_string(),
            self.target_dir.to_string_lossy().into_owned(),
            "--index-url".to_string(),
            self.variant.package_source_uri.clone(),
            "--upgrade".to_string(),
            "--no-warn-conflicts".to_string(),
        ];
        args.extend(self.packages.iter().cloned());
        args
    }

    /// Command a user can run by hand when every strategy failed.
    pub fn manual_command(&self) -> String {
        manual_install_command(&self.packages, &self.variant)
    }
}

/// `pip install <packages> --index-url <uri>`
pub fn manual_install_command(packages: &[String], variant: &VariantDescriptor) -> String {
    format!(
        "pip install {} --index-url {}",
        packages.join(" "),
        variant.package_source_uri
    )
}

/// Failure of a single strategy.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// The strategy cannot run in this context.
    #[error("not eligible: {0}")]
    NotEligible(String),

    /// The required tool or interpreter is missing.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The tool ran and failed.
    #[error("`{command}` failed ({status}){}", format_stderr(.stderr))]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_stderr(stderr: &str) -> String {
    let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
    if tail.is_empty() {
        return String::new();
    }
    let tail: Vec<&str> = tail.into_iter().rev().collect();
    format!(": {}", tail.join(" | "))
}

/// One way of acquiring the runtime packages.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait AcquisitionStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Install the requested packages into the target directory.
    async fn acquire(&self, request: &AcquisitionRequest) -> Result<(), AcquisitionError>;
}
