//! Cache management CLI commands.

use clap::Subcommand;
use console::style;
use inkwash::{fs_util, InkwashConfig};

use super::common::{format_size, open_cache};
use crate::error::CliError;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// List cached builds, most recently used first
    List,
    /// Show cache statistics
    Stats,
    /// Remove one cached build
    Remove {
        /// Build number to remove
        build: u32,
    },
    /// Remove every cached build
    Clear,
}

/// Run a cache subcommand.
pub fn run(action: CacheAction, config: &InkwashConfig) -> Result<(), CliError> {
    let cache = open_cache(config)?;

    match action {
        CacheAction::List => {
            let mut builds = cache.list();
            if builds.is_empty() {
                println!("No cached builds in {}", cache.root().display());
                return Ok(());
            }
            builds.sort_by(|a, b| b.last_used.cmp(&a.last_used));

            println!("Cached builds in {}:", cache.root().display());
            for build in &builds {
                println!(
                    "  {:>6}  {:<10} {:>10}  last used {}",
                    build.number,
                    build.hash,
                    format_size(build.size_bytes),
                    build.last_used.format("%Y-%m-%d %H:%M")
                );
            }
            Ok(())
        }
        CacheAction::Stats => {
            let stats = cache.stats();
            println!("Build cache: {}", cache.root().display());
            println!("  Builds:  {} / {}", stats.total_builds, stats.max_builds);
            println!("  Size:    {}", format_size(stats.total_size));
            println!("  On disk: {}", format_size(fs_util::dir_size(cache.root())?));
            Ok(())
        }
        CacheAction::Remove { build } => {
            if cache.remove(build)? {
                println!("{} Removed build {}", style("✓").green(), build);
            } else {
                println!("Build {} is not cached", build);
            }
            Ok(())
        }
        CacheAction::Clear => {
            let freed = cache.stats().total_size;
            let removed = cache.clear()?;
            println!(
                "{} Removed {} build(s), freed {}",
                style("✓").green(),
                removed,
                format_size(freed)
            );
            Ok(())
        }
    }
}
