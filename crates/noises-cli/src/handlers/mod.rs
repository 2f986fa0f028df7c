//! Command handlers.
//!
//! Handlers are thin: they call into `noises-runtime` through the
//! [`CliContext`](crate::CliContext) and format the result for the terminal.

pub mod paths;
pub mod probe;
pub mod run;
pub mod setup;
pub mod status;

use crate::bootstrap::CliContext;
use crate::commands::Commands;
use crate::error::CliError;

/// Run `command` to completion.
pub async fn dispatch(ctx: &CliContext, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Setup => setup::execute(ctx).await,
        Commands::Run {
            parent_pid,
            watch_stdin,
        } => {
            run::execute(
                ctx,
                run::RunOptions {
                    parent_pid,
                    watch_stdin,
                },
            )
            .await
        }
        Commands::Status => status::execute(ctx),
        Commands::Probe { json } => probe::execute(ctx, json).await,
        Commands::Paths => paths::execute(),
    }
}
