//! Inkwash CLI - Command-line interface
//!
//! Creates FiveM servers from cached or freshly downloaded FXServer builds.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;
use inkwash::logging;

use commands::builds::BuildsArgs;
use commands::cache::CacheAction;
use commands::create::CreateArgs;
use commands::servers::ServersAction;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "inkwash", version, about = "Provision FiveM servers from FXServer builds")]
struct Cli {
    /// Path to config.ini (defaults to ~/.inkwash/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create a new server
    Create(CreateArgs),
    /// List builds available for download
    Builds(BuildsArgs),
    /// Manage the local build cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Manage registered servers
    Servers {
        #[command(subcommand)]
        action: ServersAction,
    },
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = commands::common::load_config(cli.config.as_deref())?;

    // Logging is best effort.
    let _log_guard = match logging::init(&config.paths.logs, cli.verbose) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("{} logging disabled: {}", style("warning:").yellow(), e);
            None
        }
    };

    tracing::debug!(
        cache = %config.paths.cache.display(),
        registry = %config.paths.registry.display(),
        "Configuration loaded"
    );

    match cli.command {
        Commands::Create(args) => commands::create::run(args, &config),
        Commands::Builds(args) => commands::builds::run(args, &config),
        Commands::Cache { action } => commands::cache::run(action, &config),
        Commands::Servers { action } => commands::servers::run(action, &config),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {}", style("error:").red().bold(), e);
        std::process::exit(e.exit_code());
    }
}
