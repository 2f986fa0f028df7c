//! Progress reporting for runtime installation.
//!
//! # Feature Flags
//!
//! - `cli`: Enables `CliProgress`, an `indicatif` spinner for terminals.
//!   Without this feature, only `NoopProgress` is available.

/// Receives progress updates during installation.
pub trait ProgressReporter: Send + Sync {
    /// An operation of unknown length is starting.
    fn start(&self, message: &str);

    /// Log a line without disturbing the progress display.
    fn message(&self, msg: &str);

    /// The operation completed successfully.
    fn finish(&self, message: &str);

    /// The operation failed.
    fn finish_with_error(&self, message: &str);
}

/// A progress reporter that ignores all updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn start(&self, _message: &str) {}
    fn message(&self, _msg: &str) {}
    fn finish(&self, _message: &str) {}
    fn finish_with_error(&self, _message: &str) {}
}

#[cfg(feature = "cli")]
pub mod cli_progress {
    use super::ProgressReporter;
    use indicatif::{ProgressBar, ProgressStyle};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Terminal spinner with elapsed time.
    pub struct CliProgress {
        bar: Mutex<Option<ProgressBar>>,
    }

    impl CliProgress {
        pub const fn new() -> Self {
            Self {
                bar: Mutex::new(None),
            }
        }

        fn create_spinner() -> ProgressBar {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) =
                ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")
            {
                pb.set_style(style);
            }
            pb.enable_steady_tick(Duration::from_millis(120));
            pb
        }
    }

    impl Default for CliProgress {
        fn default() -> Self {
            Self::new()
        }
    }

    impl ProgressReporter for CliProgress {
        fn start(&self, message: &str) {
            let pb = Self::create_spinner();
            pb.set_message(message.to_string());
            if let Ok(mut guard) = self.bar.lock() {
                *guard = Some(pb);
            }
        }

        fn message(&self, msg: &str) {
            let Ok(guard) = self.bar.lock() else {
                return;
            };
            if let Some(ref pb) = *guard {
                pb.println(msg);
            } else {
                println!("{msg}");
            }
        }

        fn finish(&self, message: &str) {
            if let Some(pb) = self.bar.lock().ok().and_then(|mut guard| guard.take()) {
                pb.finish_with_message(message.to_string());
            }
        }

        fn finish_with_error(&self, message: &str) {
            if let Some(pb) = self.bar.lock().ok().and_then(|mut guard| guard.take()) {
                pb.abandon_with_message(message.to_string());
            }
        }
    }
}

#[cfg(feature = "cli")]
pub use cli_progress::CliProgress;
