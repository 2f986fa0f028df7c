//! Subprocess helpers shared by the acquisition strategies.

use std::ffi::OsStr;
use std::fmt;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::Duration;

use noises_core::ports::{AcquisitionError, AcquisitionRequest};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

/// An executable plus the arguments that always precede the real ones
/// (`py -3.12`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: PathBuf,
    pub leading_args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub(crate) fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args).args(args).stdin(Stdio::null());
        hide_console_window(&mut cmd);
        cmd
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.leading_args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[cfg(windows)]
fn hide_console_window(cmd: &mut Command) {
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    cmd.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_console_window(_cmd: &mut Command) {}

/// Run a short query command with a time bound, capturing output.
pub async fn run_bounded<I, S>(
    tool: &ToolCommand,
    args: I,
    limit: Duration,
) -> std::io::Result<Output>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = tool.command(args);
    cmd.stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    timeout(limit, cmd.output()).await.map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            format!("{tool} did not respond within {limit:?}"),
        )
    })?
}

/// Run the package tool's install command to completion.
///
/// Not time-bounded: a full download can legitimately take many minutes.
/// Output lines are forwarded to the log as they arrive; the stderr tail is
/// kept for the failure message.
pub async fn run_package_install(
    tool: &ToolCommand,
    request: &AcquisitionRequest,
) -> Result<(), AcquisitionError> {
    let args = request.installer_args();
    let shown = format!("{tool} {}", args.join(" "));
    info!(command = %shown, "running package tool");

    let mut cmd = tool.command(&args);
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

    let mut child = cmd
        .spawn()
        .map_err(|e| AcquisitionError::Unavailable(format!("{tool}: {e}")))?;

    let stdout_task = child.stdout.take().map(|stdout| {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(target: "noises_runtime::install::pip", "{line}");
            }
        })
    });

    let stderr_task = child.stderr.take().map(|stderr| {
        tokio::spawn(async move {
            let mut collected = Vec::new();
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(target: "noises_runtime::install::pip", "{line}");
                collected.push(line);
            }
            collected
        })
    });

    let status = child.wait().await?;

    if let Some(task) = stdout_task {
        let _ = task.await;
    }
    let stderr = match stderr_task {
        Some(task) => task.await.unwrap_or_default().join("\n"),
        None => String::new(),
    };

    if status.success() {
        Ok(())
    } else {
        Err(AcquisitionError::Failed {
            command: shown,
            status: status.to_string(),
            stderr,
        })
    }
}

/// Stdout of a finished command, falling back to stderr when stdout is
/// empty (some tools print their version to stderr).
pub fn output_text(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    if stdout.trim().is_empty() {
        String::from_utf8_lossy(&output.stderr).trim().to_string()
    } else {
        stdout.trim().to_string()
    }
}
