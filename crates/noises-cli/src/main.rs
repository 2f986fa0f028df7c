//! CLI entry point - the composition root.

use clap::{CommandFactory, Parser};
use noises_cli::{Cli, bootstrap, dispatch, load_env_files};
use noises_core::BootstrapConfig;
use noises_runtime::init_logging;
use tracing::error;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before parsing so `.env` values can feed `env`-backed arguments
    load_env_files();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = BootstrapConfig::from_env()?;
    init_logging(&config, cli.verbose);

    let ctx = bootstrap(config);
    if let Err(e) = dispatch(&ctx, command).await {
        error!(kind = e.kind(), "{e}");
        eprintln!("\n{e}");
        std::process::exit(e.exit_code());
    }
    Ok(())
}
