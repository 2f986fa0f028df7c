//! Finding an external interpreter whose ABI matches this build.
//!
//! The runtime's bridge library links against one specific interpreter
//! version, so packages must be acquired by an interpreter of exactly that
//! `major.minor`.

use std::path::PathBuf;
use std::time::Duration;

use noises_core::InterpreterVersion;
use tracing::{debug, info, warn};

use super::command::{ToolCommand, output_text, run_bounded};

const VERSION_SNIPPET: &str =
    "import sys; print(f'{sys.version_info.major}.{sys.version_info.minor}')";

/// An interpreter invocation before it is resolved on `PATH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSpec {
    pub program: String,
    pub leading_args: Vec<String>,
}

/// Candidate invocations, most specific first:
/// `python3.12`, `py -3.12`, `python3`, `python`.
pub fn candidate_specs(version: InterpreterVersion) -> Vec<CandidateSpec> {
    let spec = |program: String, leading_args: Vec<String>| CandidateSpec {
        program,
        leading_args,
    };
    vec![
        spec(format!("python{}.{}", version.major, version.minor), vec![]),
        spec("py".to_string(), vec![format!("-{version}")]),
        spec(format!("python{}", version.major), vec![]),
        spec("python".to_string(), vec![]),
    ]
}

/// Resolve the candidates that exist on `PATH`, dropping duplicates that
/// point at the same executable with the same arguments.
pub fn resolve_candidates(version: InterpreterVersion) -> Vec<ToolCommand> {
    let mut resolved: Vec<ToolCommand> = Vec::new();
    for spec in candidate_specs(version) {
        let Ok(program) = which::which(&spec.program) else {
            debug!(candidate = %spec.program, "not on PATH");
            continue;
        };
        let tool = ToolCommand::new(program).with_leading_args(spec.leading_args);
        if !resolved.contains(&tool) {
            resolved.push(tool);
        }
    }
    resolved
}

/// Ask an interpreter for its `major.minor`.
pub async fn query_version(tool: &ToolCommand, limit: Duration) -> Option<InterpreterVersion> {
    let output = run_bounded(tool, ["-c", VERSION_SNIPPET], limit).await.ok()?;
    if !output.status.success() {
        return None;
    }
    output_text(&output).parse().ok()
}

/// Whether the interpreter has a working package tool.
pub async fn has_package_tool(tool: &ToolCommand, limit: Duration) -> bool {
    run_bounded(tool, ["-m", "pip", "--version"], limit)
        .await
        .is_ok_and(|output| output.status.success())
}

/// First candidate reporting exactly `version` and having a package tool.
pub async fn find_matching_interpreter(
    candidates: &[ToolCommand],
    version: InterpreterVersion,
    limit: Duration,
) -> Option<ToolCommand> {
    for tool in candidates {
        let Some(found) = query_version(tool, limit).await else {
            debug!(candidate = %tool, "could not query version");
            continue;
        };
        if found != version {
            debug!(candidate = %tool, %found, need = %version, "version mismatch");
            continue;
        }
        if !has_package_tool(tool, limit).await {
            warn!(candidate = %tool, "matching interpreter has no package tool");
            continue;
        }
        info!(interpreter = %tool, %version, "using matching interpreter");
        return Some(tool.clone());
    }
    None
}

/// Package tool that lives next to `interpreter` (venv `bin/` or `Scripts\`).
pub fn sibling_package_tool(interpreter: &std::path::Path) -> Option<PathBuf> {
    let dir = interpreter.parent()?;
    let names: &[&str] = if cfg!(windows) {
        &["pip.exe", "pip3.exe"]
    } else {
        &["pip", "pip3"]
    };
    let mut dirs = vec![dir.to_path_buf()];
    if cfg!(windows) {
        dirs.push(dir.join("Scripts"));
    }
    dirs.iter()
        .flat_map(|dir| names.iter().map(move |name| dir.join(name)))
        .find(|candidate| candidate.is_file())
}
