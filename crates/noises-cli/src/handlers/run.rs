//! Run command handler: the supervised backend launch.
//!
//! Order matters: the single-instance lock comes first, then every shutdown
//! trigger is armed, and only then is the runtime activated, so a host that
//! dies during a long first-launch install still takes us down with it.

use std::io;
use std::sync::Arc;

use noises_core::Readiness;
use noises_runtime::install::CliProgress;
use noises_runtime::supervisor::{
    self, LockOutcome, ShutdownHandle, SupervisorError, install_signal_handlers,
    spawn_parent_watchdog, spawn_pipe_watchdog,
};
use tracing::{error, info, warn};

use crate::bootstrap::CliContext;
use crate::error::CliError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub parent_pid: Option<u32>,
    pub watch_stdin: bool,
}

pub async fn execute(ctx: &CliContext, options: RunOptions) -> Result<(), CliError> {
    let config = ctx.config();

    let guard = match supervisor::acquire(&config.lock_file)? {
        LockOutcome::Acquired(guard) => guard,
        LockOutcome::Contended { pid } => {
            info!(pid, "backend already running");
            println!("Another backend instance is already running (PID {pid}).");
            return Ok(());
        }
    };

    let shutdown = ShutdownHandle::for_process();
    shutdown.hold_lock(guard);

    if let Err(e) = arm_triggers(&shutdown, options, config.watchdog_interval) {
        shutdown.release_lock();
        return Err(e.into());
    }

    info!(loader = ctx.loader.name(), "activating runtime");
    let readiness = match ctx.activator(Arc::new(CliProgress::new())).activate().await {
        Ok(readiness) => readiness,
        Err(e) => {
            error!(kind = e.kind(), error = %e, "runtime activation failed");
            shutdown.release_lock();
            return Err(e.into());
        }
    };

    match &readiness {
        Readiness::Ready { variant } => info!(%variant, "backend ready"),
        Readiness::ReadyWithoutAcceleration => {
            warn!("backend ready without acceleration");
        }
    }

    shutdown.wait().await;
    Ok(())
}

fn arm_triggers(
    shutdown: &ShutdownHandle,
    options: RunOptions,
    interval: std::time::Duration,
) -> Result<(), SupervisorError> {
    install_signal_handlers(shutdown.clone()).map_err(spawn_error("signal handlers"))?;

    if let Some(parent_pid) = options.parent_pid {
        spawn_parent_watchdog(parent_pid, interval, shutdown.clone())
            .map_err(spawn_error("parent watchdog"))?;
        info!(parent_pid, "watching parent process");
    }

    if options.watch_stdin {
        spawn_pipe_watchdog(io::stdin(), shutdown.clone()).map_err(spawn_error("pipe watchdog"))?;
        info!("watching stdin for EOF");
    }

    Ok(())
}

fn spawn_error(what: &'static str) -> impl Fn(io::Error) -> SupervisorError {
    move |source| SupervisorError::Spawn { what, source }
}
