//! Server registry CLI commands.

use clap::Subcommand;
use console::style;
use inkwash::fs_util;
use inkwash::InkwashConfig;

use super::common::open_registry;
use crate::error::CliError;

/// Server action subcommands.
#[derive(Debug, Subcommand)]
pub enum ServersAction {
    /// List registered servers
    List,
    /// Unregister a server
    Remove {
        /// Server name
        name: String,

        /// Also delete the server directory
        #[arg(long)]
        delete_files: bool,
    },
}

/// Run a servers subcommand.
pub fn run(action: ServersAction, config: &InkwashConfig) -> Result<(), CliError> {
    let registry = open_registry(config)?;

    match action {
        ServersAction::List => {
            let servers = registry.list();
            if servers.is_empty() {
                println!("No servers registered. Create one with `inkwash create`.");
                return Ok(());
            }
            for server in &servers {
                println!(
                    "  {}  build {}  port {}",
                    style(&server.name).bold(),
                    server.build,
                    server.port
                );
                println!("      {}", server.path.display());
            }
            Ok(())
        }
        ServersAction::Remove { name, delete_files } => {
            let server = registry.remove(&name)?;
            println!("{} Unregistered '{}'", style("✓").green(), server.name);

            if delete_files && fs_util::remove_dir_if_exists(&server.path)? {
                println!("  Deleted {}", server.path.display());
            }
            Ok(())
        }
    }
}
