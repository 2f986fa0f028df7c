//! Domain model for runtime bootstrap.
//!
//! Plain values with no process or network side effects. The installation
//! state is the only part that touches the filesystem, and only to read or
//! write its two marker files.

mod capability;
mod install_state;
mod plans;
mod variant;

pub use capability::{CapabilityReport, DriverVersion, VersionParseError};
pub(crate) use capability::parse_major_minor;
pub use install_state::{
    COMPLETION_MARKER, InstallationState, VARIANT_MARKER, discard_partial, mark_complete,
};
pub use plans::{
    LibrarySearchPlan, LoadReport, PreloadPlan, PreloadPolicy, is_native_library, library_stem,
};
pub use variant::{NotSupported, ResolveError, VariantDescriptor, VariantTable};

/// Result of launch activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// The accelerated runtime is importable.
    Ready { variant: String },
    /// Development context: the runtime imports without acceleration.
    ReadyWithoutAcceleration,
}

/// Result of ensuring the runtime cache is installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// A valid cache was already present; nothing was acquired.
    AlreadyInstalled { variant: String },
    /// The runtime was acquired and verified in this call.
    Installed { variant: String },
}

impl InstallOutcome {
    pub fn variant(&self) -> &str {
        match self {
            Self::AlreadyInstalled { variant } | Self::Installed { variant } => variant,
        }
    }
}
