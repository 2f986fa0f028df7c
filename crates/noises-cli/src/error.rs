//! CLI error type and exit code mapping.

use noises_core::{BootstrapError, PathError};
use noises_runtime::SupervisorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),

    #[error(transparent)]
    Supervisor(#[from] SupervisorError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code. Bootstrap failures keep their distinct codes so the
    /// installer hook can tell them apart.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Bootstrap(e) => e.exit_code(),
            Self::Supervisor(_) | Self::Path(_) | Self::Io(_) => 1,
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Bootstrap(e) => e.kind(),
            Self::Supervisor(_) => "supervisor",
            Self::Path(_) => "path",
            Self::Io(_) => "io",
        }
    }
}
