//! Builds command - list builds available for download.

use clap::Args;
use console::style;
use inkwash::traits::ArtifactSource;
use inkwash::{ArtifactClient, InkwashConfig, Platform};

use super::common::open_cache;
use crate::error::CliError;

/// Arguments for `inkwash builds`.
#[derive(Debug, Args)]
pub struct BuildsArgs {
    /// Maximum number of builds to show
    #[arg(short, long, default_value_t = 15)]
    pub limit: usize,

    /// Show every build in the listing
    #[arg(long, conflicts_with = "limit")]
    pub all: bool,
}

/// Run the builds command.
pub fn run(args: BuildsArgs, config: &InkwashConfig) -> Result<(), CliError> {
    let platform = Platform::current();
    let client = ArtifactClient::from_config(platform, &config.download)?;
    let cache = open_cache(config)?;

    println!("Fetching {} builds from {}", platform, client.base_url());
    let mut builds = client.fetch_builds()?;
    builds.sort_by(|a, b| b.number.cmp(&a.number));

    let shown = if args.all {
        builds.len()
    } else {
        args.limit.min(builds.len())
    };

    println!();
    for build in builds.iter().take(shown) {
        let tag = if build.recommended {
            style("recommended").green().to_string()
        } else if build.optional {
            style("optional").yellow().to_string()
        } else {
            String::new()
        };
        let cached = if cache.has(build.number) {
            style("cached").cyan().to_string()
        } else {
            String::new()
        };
        println!("  {:>6}  {:<10} {:<12} {}", build.number, build.hash, tag, cached);
    }

    if shown < builds.len() {
        println!();
        println!("  ... {} more (use --all to show everything)", builds.len() - shown);
    }
    Ok(())
}
