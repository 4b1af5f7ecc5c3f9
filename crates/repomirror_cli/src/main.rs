//! Repomirror CLI - mirror every repository of one forge account to another.

mod commands;
mod config;
mod progress;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::Term;
use tracing_subscriber::EnvFilter;

use crate::commands::list::OutputFormat;
use crate::config::Side;

#[derive(Parser)]
#[command(name = "repomirror")]
#[command(version)]
#[command(about = "Mirror every repository of a forge account to another forge")]
#[command(
    long_about = "Repomirror lists the repositories of a source account (GitHub, GitLab, \
Gitea/Forgejo/Codeberg), creates the missing ones on a target account with the same \
visibility, aligns the visibility of existing ones, and pushes every branch and tag \
with a forced mirror push."
)]
#[command(after_long_help = r#"EXAMPLES
    Preview what a run would change:
        $ repomirror run --dry-run

    Mirror only public repositories, two at a time:
        $ repomirror run --public-only --max-in-flight 2

    Show the target account's repositories as JSON:
        $ repomirror list target --output json

    Generate shell completions:
        $ repomirror completions bash > ~/.local/share/bash-completion/completions/repomirror

CONFIGURATION
    Repomirror reads configuration from:
      1. ~/.config/repomirror/config.toml (or $XDG_CONFIG_HOME/repomirror/config.toml)
      2. ./repomirror.toml
      3. Environment variables (REPOMIRROR_SECTION__KEY, e.g. REPOMIRROR_SOURCE__TOKEN)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    REPOMIRROR_SOURCE__PLATFORM   github, gitlab or gitea
    REPOMIRROR_SOURCE__HOST       API host (default: the platform's public instance)
    REPOMIRROR_SOURCE__USERNAME   Source account name
    REPOMIRROR_SOURCE__TOKEN      Source personal access token
    REPOMIRROR_TARGET__*          Same keys for the target account
    RUST_LOG                      Log filter for non-interactive output
"#)]
struct Cli {
    /// Config file to use instead of the default locations
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mirror the source account into the target account
    Run(RunArgs),
    /// List the repositories of one configured account
    List {
        /// Which account to list
        #[arg(value_enum)]
        side: Side,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
    /// Generate man page(s)
    Man {
        /// Output directory for man pages (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Options for `repomirror run`; each overrides the config file.
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct RunArgs {
    /// Dry run - show what would be done without making changes
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Skip private source repositories
    #[arg(short = 'p', long)]
    public_only: bool,

    /// Mirror jobs running at once (default from config or 1)
    #[arg(short = 'j', long)]
    max_in_flight: Option<usize>,

    /// Keep mirroring after a job fails and report every failure at the end
    #[arg(short = 'k', long)]
    continue_on_error: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Structured logging only without a TTY; a TTY gets progress bars.
    if !Term::stdout().is_term() {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("repomirror=info,repomirror_cli=info"),
        };

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::Completions { shell } => {
            commands::meta::handle_completions(shell)?;
        }
        Commands::Man { output } => {
            commands::meta::handle_man(output)?;
        }
        Commands::List { side, output } => {
            let config = config::Config::load(cli.config.as_deref())?;
            commands::list::handle_list(side, output, &config).await?;
        }
        Commands::Run(args) => {
            let config = config::Config::load(cli.config.as_deref())?;
            let stop = shutdown::setup_shutdown_handler();
            commands::run::handle_run(args, &config, stop).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from([
            "repomirror",
            "run",
            "--dry-run",
            "--public-only",
            "--max-in-flight",
            "3",
            "--continue-on-error",
        ])
        .unwrap();

        match cli.command {
            Commands::Run(args) => {
                assert!(args.dry_run);
                assert!(args.public_only);
                assert_eq!(args.max_in_flight, Some(3));
                assert!(args.continue_on_error);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn list_parses_side_and_format() {
        let cli = Cli::try_parse_from([
            "repomirror",
            "--config",
            "mirror.toml",
            "list",
            "target",
            "-o",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("mirror.toml")));
        match cli.command {
            Commands::List { side, output } => {
                assert_eq!(side, Side::Target);
                assert!(matches!(output, OutputFormat::Json));
            }
            _ => panic!("expected list"),
        }
    }

    #[test]
    fn list_rejects_unknown_side() {
        assert!(Cli::try_parse_from(["repomirror", "list", "elsewhere"]).is_err());
    }
}
