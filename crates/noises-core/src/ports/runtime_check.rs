//! Importability check for the accelerated runtime.

use std::path::{Path, PathBuf};

/// Whether the runtime can be used by this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportStatus {
    Importable {
        accelerated: bool,
        location: Option<PathBuf>,
    },
    NotImportable {
        reason: String,
    },
}

impl ImportStatus {
    pub const fn is_importable(&self) -> bool {
        matches!(self, Self::Importable { .. })
    }

    pub const fn is_accelerated(&self) -> bool {
        matches!(self, Self::Importable { accelerated: true, .. })
    }
}

/// Port answering "can the runtime be imported right now?".
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
pub trait RuntimeImportCheck: Send + Sync {
    /// Check against a prepared cache, or the default search path if `None`.
    fn check<'a>(&self, cache_dir: Option<&'a Path>) -> ImportStatus;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_predicates() {
        let accelerated = ImportStatus::Importable {
            accelerated: true,
            location: None,
        };
        let cpu_only = ImportStatus::Importable {
            accelerated: false,
            location: Some(PathBuf::from("/cache/torch")),
        };
        let missing = ImportStatus::NotImportable {
            reason: "not found".to_string(),
        };

        assert!(accelerated.is_accelerated());
        assert!(cpu_only.is_importable() && !cpu_only.is_accelerated());
        assert!(!missing.is_importable());
    }
}
