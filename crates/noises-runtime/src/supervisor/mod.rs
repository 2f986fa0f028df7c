//! Process supervision for the backend.
//!
//! - single-instance lock file ([`lock`])
//! - parent and pipe watchdogs ([`watchdog`])
//! - termination signals ([`signals`])
//! - the forced-shutdown path they all share ([`shutdown`])

pub mod lock;
pub mod process;
pub mod shutdown;
pub mod signals;
pub mod watchdog;

use std::path::PathBuf;

use thiserror::Error;

pub use lock::{LockGuard, LockOutcome, acquire, acquire_with, read_lock_pid};
pub use process::{descendants, kill_descendants, pid_alive};
pub use shutdown::{ProcessTerminator, ShutdownHandle, Terminator};
pub use signals::install_signal_handlers;
pub use watchdog::{spawn_parent_watchdog, spawn_pipe_watchdog};

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to write lock file {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start {what}: {source}")]
    Spawn {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },
}
