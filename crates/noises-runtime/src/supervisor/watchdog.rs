//! Background watchdogs that force shutdown when the host goes away.
//!
//! Both run on named OS threads so they keep working even if the async
//! runtime is blocked.

use std::io::{self, Read};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use super::process::pid_alive;
use super::shutdown::ShutdownHandle;

/// Watch the parent process and shut down when it exits.
pub fn spawn_parent_watchdog(
    parent_pid: u32,
    interval: Duration,
    handle: ShutdownHandle,
) -> io::Result<JoinHandle<()>> {
    spawn_parent_watchdog_with(parent_pid, interval, handle, pid_alive)
}

/// Same as [`spawn_parent_watchdog`] with an injectable liveness check.
pub fn spawn_parent_watchdog_with<F>(
    parent_pid: u32,
    interval: Duration,
    handle: ShutdownHandle,
    is_alive: F,
) -> io::Result<JoinHandle<()>>
where
    F: Fn(u32) -> bool + Send + 'static,
{
    thread::Builder::new()
        .name("parent-watchdog".to_string())
        .spawn(move || {
            debug!(parent_pid, ?interval, "parent watchdog started");
            while !handle.is_requested() {
                if !is_alive(parent_pid) {
                    warn!(parent_pid, "parent process exited");
                    handle.request(&format!("parent process {parent_pid} exited"));
                    return;
                }
                thread::sleep(interval);
            }
        })
}

/// Read `input` until EOF and shut down when the pipe closes.
///
/// The host keeps our stdin open for as long as it lives, so EOF (or a read
/// error) means it is gone even if it was killed without notice.
pub fn spawn_pipe_watchdog<R>(mut input: R, handle: ShutdownHandle) -> io::Result<JoinHandle<()>>
where
    R: Read + Send + 'static,
{
    thread::Builder::new()
        .name("pipe-watchdog".to_string())
        .spawn(move || {
            debug!("pipe watchdog started");
            let reason = match io::copy(&mut input, &mut io::sink()) {
                Ok(_) => "stdin closed".to_string(),
                Err(e) => format!("stdin read failed: {e}"),
            };
            handle.request(&reason);
        })
}
