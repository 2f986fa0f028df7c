//! Runs the built binary against an isolated data directory.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn backend(data: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_noises-backend"))
        .args(args)
        .env("NOISES_DATA_DIR", data)
        .env("NOISES_CACHE_DIR", data.join("runtime"))
        .env("NOISES_LOCK_FILE", data.join("noises-backend.lock"))
        .env_remove("NOISES_LOG_FILE")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn paths_reports_overrides() {
    let temp = TempDir::new().unwrap();
    let output = backend(temp.path(), &["paths"]);

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains(&temp.path().join("runtime").display().to_string()));
    assert!(text.contains("setup.log"));
}

#[test]
fn status_on_fresh_machine() {
    let temp = TempDir::new().unwrap();
    let output = backend(temp.path(), &["status"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("status = not installed"));
}

#[test]
fn second_instance_exits_cleanly() {
    let temp = TempDir::new().unwrap();
    let lock = temp.path().join("noises-backend.lock");
    // The test process itself is a live holder.
    fs::write(&lock, format!("{}\n", std::process::id())).unwrap();

    let output = backend(temp.path(), &["run"]);

    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).contains("already running"));
    assert_eq!(
        fs::read_to_string(&lock).unwrap().trim(),
        std::process::id().to_string()
    );
}

#[test]
fn log_file_is_created_in_data_dir() {
    let temp = TempDir::new().unwrap();
    let _ = backend(temp.path(), &["status", "--verbose"]);
    let log = temp.path().join("setup.log");
    assert!(log.exists());
}
