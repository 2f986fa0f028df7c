//! Available subcommands.

use clap::Subcommand;

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Install the accelerated runtime once (install-time hook)
    Setup,

    /// Activate the runtime and supervise the backend until shutdown
    Run {
        /// Shut down when this process exits
        #[arg(long = "parent-pid", env = "NOISES_PARENT_PID")]
        parent_pid: Option<u32>,

        /// Shut down when stdin reaches EOF (host holds the pipe open)
        #[arg(long = "watch-stdin")]
        watch_stdin: bool,
    },

    /// Show the runtime cache location and state
    Status,

    /// Detect the accelerator and the runtime build it needs
    Probe {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Show resolved paths
    Paths,
}
