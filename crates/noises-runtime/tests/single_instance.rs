//! Lock contention against real processes.

#![cfg(unix)]

use std::fs;
use std::process::Command;

use noises_runtime::supervisor::{LockOutcome, acquire, read_lock_pid};
use tempfile::TempDir;

#[test]
fn live_holder_blocks_then_dead_holder_is_reclaimed() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("noises-backend.lock");

    let mut holder = Command::new("sleep").arg("30").spawn().unwrap();
    fs::write(&path, format!("{}\n", holder.id())).unwrap();

    match acquire(&path).unwrap() {
        LockOutcome::Contended { pid } => assert_eq!(pid, holder.id()),
        LockOutcome::Acquired(_) => panic!("lock held by a live process was taken"),
    }
    assert_eq!(read_lock_pid(&path), Some(holder.id()));

    holder.kill().unwrap();
    holder.wait().unwrap();

    let LockOutcome::Acquired(guard) = acquire(&path).unwrap() else {
        panic!("stale lock was not reclaimed");
    };
    assert_eq!(read_lock_pid(&path), Some(std::process::id()));

    guard.release();
    assert!(!path.exists());
}
