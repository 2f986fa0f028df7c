//! Forced shutdown.
//!
//! Every trigger (parent gone, pipe closed, signal, explicit request) ends
//! up in [`ShutdownHandle::request`]. The first caller wins; later and
//! concurrent calls return immediately.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Notify;
use tracing::{info, warn};

use super::lock::LockGuard;
use super::process;

/// The irreversible part of shutting down.
#[cfg_attr(test, mockall::automock)]
pub trait Terminator: Send + Sync {
    /// Kill every descendant of this process; returns how many were killed.
    fn kill_descendants(&self) -> usize;
    /// Leave the process with `code`.
    fn exit(&self, code: i32);
}

/// Kills the real process tree and exits the real process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessTerminator;

impl Terminator for ProcessTerminator {
    fn kill_descendants(&self) -> usize {
        process::kill_descendants(std::process::id())
    }

    fn exit(&self, code: i32) {
        std::process::exit(code);
    }
}

struct Inner {
    requested: AtomicBool,
    notify: Notify,
    lock: Mutex<Option<LockGuard>>,
    reason: Mutex<Option<String>>,
    terminator: Arc<dyn Terminator>,
}

/// Cloneable trigger for the process-wide forced shutdown.
#[derive(Clone)]
pub struct ShutdownHandle {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ShutdownHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownHandle")
            .field("requested", &self.is_requested())
            .finish_non_exhaustive()
    }
}

impl ShutdownHandle {
    pub fn new(terminator: Arc<dyn Terminator>) -> Self {
        Self {
            inner: Arc::new(Inner {
                requested: AtomicBool::new(false),
                notify: Notify::new(),
                lock: Mutex::new(None),
                reason: Mutex::new(None),
                terminator,
            }),
        }
    }

    /// Handle that kills the real process tree on shutdown.
    pub fn for_process() -> Self {
        Self::new(Arc::new(ProcessTerminator))
    }

    /// Hand over the single-instance lock so it is released on shutdown.
    pub fn hold_lock(&self, guard: LockGuard) {
        *self
            .inner
            .lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(guard);
    }

    /// Release a held lock without shutting down, for error exits.
    pub fn release_lock(&self) {
        let guard = self
            .inner
            .lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(guard) = guard {
            guard.release();
        }
    }

    pub fn is_requested(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }

    /// Reason given by the call that triggered shutdown.
    pub fn reason(&self) -> Option<String> {
        self.inner
            .reason
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Force shutdown: release the lock, kill the subtree, exit.
    ///
    /// Returns `true` for the one call that performed the shutdown.
    pub fn request(&self, reason: &str) -> bool {
        if self
            .inner
            .requested
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        warn!(%reason, "forced shutdown");
        *self
            .inner
            .reason
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(reason.to_string());

        self.release_lock();

        let killed = self.inner.terminator.kill_descendants();
        if killed > 0 {
            info!(killed, "terminated child processes");
        }

        self.inner.notify.notify_waiters();
        self.inner.terminator.exit(0);
        true
    }

    /// Resolve once shutdown has been requested.
    pub async fn wait(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.is_requested() {
            return;
        }
        notified.await;
    }
}
