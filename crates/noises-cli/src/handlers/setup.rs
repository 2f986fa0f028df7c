//! Setup command handler (install-time hook).

use std::sync::Arc;

use noises_core::InstallOutcome;
use noises_runtime::install::{CliProgress, Install};
use tracing::info;

use crate::bootstrap::CliContext;
use crate::error::CliError;

/// Install the runtime once and report what happened.
///
/// Exit status is non-zero when installation fails; the error carries the
/// exit code for its kind.
pub async fn execute(ctx: &CliContext) -> Result<(), CliError> {
    info!(
        cache = %ctx.config().cache_dir.display(),
        log = %ctx.config().log_file.display(),
        "runtime setup"
    );

    let installer = ctx.installer(Arc::new(CliProgress::new()));
    let outcome = installer.ensure_installed().await?;

    println!("{}", describe(&outcome));
    Ok(())
}

fn describe(outcome: &InstallOutcome) -> String {
    match outcome {
        InstallOutcome::AlreadyInstalled { variant } => {
            format!("Runtime already installed ({variant}).")
        }
        InstallOutcome::Installed { variant } => format!("Runtime installed ({variant})."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_messages_name_the_variant() {
        assert_eq!(
            describe(&InstallOutcome::Installed {
                variant: "cu128".to_string()
            }),
            "Runtime installed (cu128)."
        );
        assert!(
            describe(&InstallOutcome::AlreadyInstalled {
                variant: "?".to_string()
            })
            .contains("already")
        );
    }
}
