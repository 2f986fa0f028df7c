//! Accelerator capability model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A `major.minor` version reported by the accelerator driver.
///
/// Ordering is lexicographic on `(major, minor)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DriverVersion {
    pub major: u32,
    pub minor: u32,
}

impl DriverVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for DriverVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Failure to parse a `major.minor` version string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid version string: {0:?}")]
pub struct VersionParseError(pub String);

impl FromStr for DriverVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_major_minor(s)
            .map(|(major, minor)| Self::new(major, minor))
            .ok_or_else(|| VersionParseError(s.to_string()))
    }
}

/// Parse the leading `major.minor` of a version string.
///
/// Extra components and trailing non-digits are ignored: `"12.0-rc1"` and
/// `"12.0.85"` both yield `(12, 0)`. A missing minor component is treated
/// as zero.
pub(crate) fn parse_major_minor(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.trim().split('.');

    let major = leading_number(parts.next()?)?;
    let minor = match parts.next() {
        Some(part) => leading_number(part).unwrap_or(0),
        None => 0,
    };

    Some((major, minor))
}

fn leading_number(part: &str) -> Option<u32> {
    let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Snapshot of the accelerator hardware visible to this machine.
///
/// Produced fresh on every probe and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CapabilityReport {
    pub accelerator_present: bool,
    pub accelerator_name: Option<String>,
    pub driver_version: Option<DriverVersion>,
}

impl CapabilityReport {
    /// Degraded value used whenever probing fails.
    pub const fn absent() -> Self {
        Self {
            accelerator_present: false,
            accelerator_name: None,
            driver_version: None,
        }
    }

    pub fn present(name: impl Into<String>, driver_version: Option<DriverVersion>) -> Self {
        Self {
            accelerator_present: true,
            accelerator_name: Some(name.into()),
            driver_version,
        }
    }
}

impl fmt::Display for CapabilityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.accelerator_present {
            return write!(f, "no accelerator detected");
        }
        let name = self.accelerator_name.as_deref().unwrap_or("unknown accelerator");
        match self.driver_version {
            Some(version) => write!(f, "{name} (driver supports CUDA {version})"),
            None => write!(f, "{name} (driver version unknown)"),
        }
    }
}
