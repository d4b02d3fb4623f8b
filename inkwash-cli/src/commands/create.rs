//! Create command - install a new FXServer.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use inkwash::install::{DefaultResources, ResourcesOutcome};
use inkwash::traits::ArtifactSource;
use inkwash::{
    ArtifactClient, Downloader, InkwashConfig, InstallProgress, InstallRequest, Installer,
    JsonMetadataStore, Platform, TemplateConfigGenerator,
};

use super::common::{open_cache, open_registry};
use crate::error::CliError;

/// Resolution of the progress bar.
const BAR_LENGTH: u64 = 1000;

/// Arguments for `inkwash create`.
#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Server name
    pub name: String,

    /// Build number (defaults to the recommended build)
    #[arg(short, long)]
    pub build: Option<u32>,

    /// Parent directory for the server folder (defaults to paths.servers)
    #[arg(short, long)]
    pub path: Option<PathBuf>,

    /// Server port (defaults to defaults.port)
    #[arg(long)]
    pub port: Option<u16>,

    /// Cfx.re license key written to server.cfg
    #[arg(long, default_value = "")]
    pub license_key: String,
}

/// Pick the recommended build, or the newest one if none is flagged.
fn default_build(source: &dyn ArtifactSource) -> Result<u32, CliError> {
    let builds = source.fetch_builds()?;
    builds
        .iter()
        .find(|b| b.recommended)
        .or_else(|| builds.iter().max_by_key(|b| b.number))
        .map(|b| b.number)
        .ok_or_else(|| CliError::Usage("no builds available".to_string()))
}

fn progress_message(progress: &InstallProgress) -> String {
    let mut message = format!(
        "[{}/{}] {}",
        progress.step.index() + 1,
        progress.total_steps,
        progress.message
    );
    if progress.download_speed > 0.0 {
        message.push_str(&format!(" ({:.1} MB/s", progress.download_speed));
        if let Some(eta) = progress.download_eta {
            message.push_str(&format!(", {}s left", eta.as_secs()));
        }
        message.push(')');
    }
    message
}

/// Run the create command.
pub fn run(args: CreateArgs, config: &InkwashConfig) -> Result<(), CliError> {
    let platform = Platform::current();
    let source = Arc::new(ArtifactClient::from_config(platform, &config.download)?);

    let build_number = match args.build {
        Some(number) => number,
        None => {
            let number = default_build(source.as_ref())?;
            println!("Using recommended build {}", number);
            number
        }
    };

    let downloader = Downloader::from_config(&config.download)?;
    tracing::debug!(
        chunks = downloader.chunks(),
        timeout = ?downloader.timeout(),
        "Downloader configured"
    );

    let installer = Installer::new(
        source,
        Arc::new(downloader),
        Arc::new(open_cache(config)?),
        Arc::new(open_registry(config)?),
        Arc::new(JsonMetadataStore::new()),
        Arc::new(TemplateConfigGenerator::new(platform)),
    )
    .with_resources(DefaultResources::new(config.resources.repository.clone()))
    .with_temp_dir(config.paths.cache.join(".downloads"));

    let request = InstallRequest::new(
        args.name,
        args.path.unwrap_or_else(|| config.paths.servers.clone()),
        build_number,
    )
    .with_license_key(args.license_key)
    .with_port(args.port.unwrap_or(config.defaults.port));

    let bar = ProgressBar::new(BAR_LENGTH);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {percent:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    let on_progress = |progress: &InstallProgress| {
        bar.set_position((progress.progress * BAR_LENGTH as f64) as u64);
        bar.set_message(progress_message(progress));
    };

    let result = installer.install(&request, &on_progress);
    bar.finish_and_clear();
    let result = result?;

    println!(
        "{} Created '{}' with build {}{}",
        style("✓").green(),
        result.server.name,
        result.build.number,
        if result.from_cache { " (from cache)" } else { "" }
    );
    println!("  Path: {}", result.server_path().display());
    println!("  Port: {}", result.server.port);
    if result.resources == ResourcesOutcome::Skeleton {
        println!(
            "  {} default resources could not be cloned; created an empty resources/ folder",
            style("note:").yellow()
        );
    }
    if request.license_key.is_empty() {
        println!(
            "  {} no license key given; set sv_licenseKey in server.cfg before starting",
            style("note:").yellow()
        );
    }
    Ok(())
}
