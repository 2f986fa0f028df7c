//! Single-instance lock file.
//!
//! Format: the holder's decimal PID on a single line. A lock naming a PID
//! that no longer exists is stale and reclaimed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::SupervisorError;
use super::process::pid_alive;

/// Result of trying to take the lock.
#[derive(Debug)]
pub enum LockOutcome {
    Acquired(LockGuard),
    /// Another live process holds the lock; the file was left untouched.
    Contended { pid: u32 },
}

/// Ownership of the lock file; removed on drop if it still names us.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
    pid: u32,
    released: bool,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub const fn pid(&self) -> u32 {
        self.pid
    }

    /// Remove the lock file if it still holds our PID.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        match read_lock_pid(&self.path) {
            Some(pid) if pid == self.pid => match remove_if_exists(&self.path) {
                Ok(()) => debug!(path = %self.path.display(), "lock released"),
                Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove lock file"),
            },
            Some(pid) => {
                debug!(holder = pid, "lock file now belongs to another process; leaving it");
            }
            None => {}
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.release_inner();
    }
}

/// Take the lock for the current process.
pub fn acquire(path: &Path) -> Result<LockOutcome, SupervisorError> {
    acquire_with(path, std::process::id(), pid_alive)
}

/// Take the lock for `own_pid`, judging other holders with `is_alive`.
pub fn acquire_with(
    path: &Path,
    own_pid: u32,
    is_alive: impl Fn(u32) -> bool,
) -> Result<LockOutcome, SupervisorError> {
    match read_lock_pid(path) {
        Some(pid) if pid != own_pid && is_alive(pid) => {
            info!(pid, path = %path.display(), "another instance holds the lock");
            return Ok(LockOutcome::Contended { pid });
        }
        Some(pid) if pid != own_pid => {
            info!(pid, "reclaiming stale lock");
        }
        _ => {}
    }

    write_lock_file(path, own_pid).map_err(|source| SupervisorError::Lock {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(pid = own_pid, path = %path.display(), "lock acquired");

    Ok(LockOutcome::Acquired(LockGuard {
        path: path.to_path_buf(),
        pid: own_pid,
        released: false,
    }))
}

/// PID recorded in the lock file, if the file exists and is well formed.
///
/// PID 0 is not a process and counts as malformed.
pub fn read_lock_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path)
        .ok()
        .and_then(|content| content.lines().next()?.trim().parse().ok())
        .filter(|pid| *pid != 0)
}

/// Write atomically via temp file + rename.
fn write_lock_file(path: &Path, pid: u32) -> io::Result<()> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(format!(".{pid}.tmp"));
    let temp_path = PathBuf::from(temp_name);

    fs::write(&temp_path, format!("{pid}\n"))?;
    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    Ok(())
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
