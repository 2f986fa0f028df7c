//! Prebuilt runtime variants and driver-version resolution.
//!
//! Each variant is a build of the accelerated runtime compiled against one
//! toolkit release. Drivers are backward compatible, so the newest variant
//! whose minimum driver version is satisfied is the right one.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::capability::{DriverVersion, VersionParseError};

const PACKAGE_INDEX_BASE: &str = "https://download.pytorch.org/whl";

/// One prebuilt runtime build and where to fetch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantDescriptor {
    pub min_driver_version: DriverVersion,
    pub variant_tag: String,
    pub package_source_uri: String,
}

impl VariantDescriptor {
    pub fn new(
        min_driver_version: DriverVersion,
        variant_tag: impl Into<String>,
        package_source_uri: impl Into<String>,
    ) -> Self {
        Self {
            min_driver_version,
            variant_tag: variant_tag.into(),
            package_source_uri: package_source_uri.into(),
        }
    }

    /// Variant served from the standard package index under its tag.
    pub fn from_index(major: u32, minor: u32, tag: &str) -> Self {
        Self::new(
            DriverVersion::new(major, minor),
            tag,
            format!("{PACKAGE_INDEX_BASE}/{tag}"),
        )
    }
}

impl fmt::Display for VariantDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (requires driver >= {})",
            self.variant_tag, self.min_driver_version
        )
    }
}

/// No variant in the table supports the detected driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("driver version {driver} is older than every supported runtime variant")]
pub struct NotSupported {
    pub driver: DriverVersion,
    pub oldest_supported: Option<DriverVersion>,
}

/// Failure of [`VariantTable::resolve_str`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error(transparent)]
    InvalidVersion(#[from] VersionParseError),
    #[error(transparent)]
    NotSupported(#[from] NotSupported),
}

/// Immutable variant table, ordered newest first.
///
/// Construction sorts entries by descending minimum driver version so the
/// first-match scan in [`resolve`](Self::resolve) always finds the newest
/// compatible variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantTable {
    entries: Vec<VariantDescriptor>,
}

impl VariantTable {
    pub fn new(mut entries: Vec<VariantDescriptor>) -> Self {
        entries.sort_by(|a, b| b.min_driver_version.cmp(&a.min_driver_version));
        Self { entries }
    }

    /// Pick the newest variant whose minimum driver version is `<= driver`.
    pub fn resolve(&self, driver: DriverVersion) -> Result<&VariantDescriptor, NotSupported> {
        self.entries
            .iter()
            .find(|entry| entry.min_driver_version <= driver)
            .ok_or_else(|| NotSupported {
                driver,
                oldest_supported: self.oldest().map(|entry| entry.min_driver_version),
            })
    }

    /// Parse a driver version string and resolve it.
    pub fn resolve_str(&self, driver: &str) -> Result<&VariantDescriptor, ResolveError> {
        let version: DriverVersion = driver.parse()?;
        Ok(self.resolve(version)?)
    }

    pub fn newest(&self) -> Option<&VariantDescriptor> {
        self.entries.first()
    }

    pub fn oldest(&self) -> Option<&VariantDescriptor> {
        self.entries.last()
    }

    pub fn find_tag(&self, tag: &str) -> Option<&VariantDescriptor> {
        self.entries.iter().find(|entry| entry.variant_tag == tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VariantDescriptor> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for VariantTable {
    fn default() -> Self {
        Self::new(vec![
            VariantDescriptor::from_index(13, 0, "cu130"),
            VariantDescriptor::from_index(12, 8, "cu128"),
            VariantDescriptor::from_index(12, 6, "cu126"),
            VariantDescriptor::from_index(12, 4, "cu124"),
            VariantDescriptor::from_index(12, 1, "cu121"),
            VariantDescriptor::from_index(11, 8, "cu118"),
        ])
    }
}
