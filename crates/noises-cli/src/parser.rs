//! Root CLI structure with global options.

use clap::Parser;

use crate::commands::Commands;

/// Backend launcher for Noises.
///
/// Installs the accelerated runtime on first use and supervises the backend
/// process on every launch.
#[derive(Parser)]
#[command(name = "noises-backend")]
#[command(about = "Set up and launch the Noises backend runtime")]
#[command(version)]
pub struct Cli {
    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_verbose_after_subcommand() {
        let cli = Cli::parse_from(["noises-backend", "status", "--verbose"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Some(Commands::Status)));
    }

    #[test]
    fn test_no_command() {
        let cli = Cli::parse_from(["noises-backend"]);
        assert!(cli.command.is_none());
    }
}
