//! Tracing setup: console plus the persistent setup log.
//!
//! The file writer is blocking so lines emitted right before a forced
//! `process::exit` still reach the disk.

use std::fs;
use std::path::Path;

use noises_core::BootstrapConfig;
use tracing::warn;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Install the global subscriber. Never fails; returns whether the log file
/// layer is active.
///
/// Level: `debug` with `verbose`, otherwise `RUST_LOG` or `info`.
pub fn init_logging(config: &BootstrapConfig, verbose: bool) -> bool {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    match open_log_file(&config.log_file) {
        Ok(appender) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(appender)
                        .with_ansi(false),
                )
                .try_init()
                .ok();
            true
        }
        Err(e) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .try_init()
                .ok();
            warn!(
                path = %config.log_file.display(),
                error = %e,
                "could not open log file; logging to console only"
            );
            false
        }
    }
}

/// Append-only writer for `path`.
pub fn open_log_file(path: &Path) -> Result<RollingFileAppender, InitError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    // The builder creates the directory too, but reports failures less clearly.
    let _ = fs::create_dir_all(dir);

    let stem = path
        .file_stem()
        .map_or_else(|| "setup".to_string(), |s| s.to_string_lossy().into_owned());

    let mut builder = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(stem);
    if let Some(ext) = path.extension() {
        builder = builder.filename_suffix(ext.to_string_lossy().into_owned());
    }
    builder.build(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn log_file_keeps_its_name_and_appends() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("logs").join("setup.log");

        {
            let mut writer = open_log_file(&path).unwrap();
            writer.write_all(b"first\n").unwrap();
            writer.flush().unwrap();
        }
        {
            let mut writer = open_log_file(&path).unwrap();
            writer.write_all(b"second\n").unwrap();
            writer.flush().unwrap();
        }

        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn init_is_repeatable() {
        let temp = TempDir::new().unwrap();
        let config = BootstrapConfig::new(
            temp.path().join("runtime"),
            temp.path().join("setup.log"),
            temp.path().join("noises.lock"),
        );

        assert!(init_logging(&config, true));
        // A second init leaves the first subscriber in place.
        assert!(init_logging(&config, false));
    }
}
