//! Termination signals routed into the forced-shutdown path.

use std::io;

use tokio::task::JoinHandle;
use tracing::debug;

use super::shutdown::ShutdownHandle;

/// Install listeners for SIGTERM/SIGINT (Ctrl-C on Windows).
///
/// Must be called from within a tokio runtime. Listener registration
/// happens before this returns, so a signal arriving right after is caught.
pub fn install_signal_handlers(handle: ShutdownHandle) -> io::Result<JoinHandle<()>> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate = signal(SignalKind::terminate())?;
        let mut interrupt = signal(SignalKind::interrupt())?;
        debug!("signal handlers installed");

        Ok(tokio::spawn(async move {
            let name = tokio::select! {
                _ = terminate.recv() => "SIGTERM",
                _ = interrupt.recv() => "SIGINT",
            };
            handle.request(&format!("received {name}"));
        }))
    }

    #[cfg(not(unix))]
    {
        debug!("ctrl-c handler installed");
        Ok(tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                handle.request("received Ctrl-C");
            }
        }))
    }
}
