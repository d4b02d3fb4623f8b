//! The installation pipeline.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::naming::{slugify, unique_folder_name};
use super::progress::{
    download_progress, InstallProgress, InstallProgressFn, InstallStep, ProgressTracker,
    DOWNLOAD_END, DOWNLOAD_START,
};
use super::resources::{DefaultResources, ResourcesOutcome};
use crate::artifact::Build;
use crate::cache::BinaryCache;
use crate::download::DownloadProgress;
use crate::error::{fs_context, InkwashError, InkwashResult};
use crate::extract::Extractor;
use crate::fs_util;
use crate::server::{Server, ServerMetadata};
use crate::traits::{ArchiveDownloader, ArtifactSource, ConfigGenerator, MetadataStore, ServerRegistry};

/// Default FXServer port.
pub const DEFAULT_PORT: u16 = 30120;

/// Name of the binaries directory inside a server.
pub const BIN_DIR: &str = "bin";

const WRITE_PROBE: &str = ".inkwash-test";

/// What to install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    pub server_name: String,
    /// Parent directory the server folder is created in.
    pub install_path: PathBuf,
    pub build_number: u32,
    pub license_key: String,
    pub port: u16,
}

impl InstallRequest {
    pub fn new(server_name: impl Into<String>, install_path: impl Into<PathBuf>, build_number: u32) -> Self {
        Self {
            server_name: server_name.into(),
            install_path: install_path.into(),
            build_number,
            license_key: String::new(),
            port: DEFAULT_PORT,
        }
    }

    pub fn with_license_key(mut self, license_key: impl Into<String>) -> Self {
        self.license_key = license_key.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

/// A completed installation.
#[derive(Debug, Clone)]
pub struct InstallResult {
    pub server: Server,
    pub build: Build,
    /// Whether the binaries came from the local cache.
    pub from_cache: bool,
    pub resources: ResourcesOutcome,
}

impl InstallResult {
    pub fn server_path(&self) -> &Path {
        &self.server.path
    }

    pub fn binary_path(&self) -> &Path {
        &self.server.binary_path
    }
}

/// Wrap an error with the step it happened in.
fn at(step: InstallStep) -> impl FnOnce(InkwashError) -> InkwashError {
    move |source| InkwashError::Install {
        step,
        source: Box::new(source),
    }
}

/// Directory holding the server binaries inside an extracted build.
///
/// Linux builds wrap everything in a single `alpine/` directory. When the
/// tree has exactly one entry, that entry is a directory, and it holds more
/// than one entry, the wrapper is used as the root.
pub fn resolve_binary_root(extracted: &Path) -> PathBuf {
    let Ok(entries) = fs::read_dir(extracted) else {
        return extracted.to_path_buf();
    };
    let entries: Vec<_> = entries.filter_map(Result::ok).collect();

    if let [only] = entries.as_slice() {
        let nested = only.path();
        if nested.is_dir() {
            let children = fs::read_dir(&nested).map(|rd| rd.count()).unwrap_or(0);
            if children > 1 {
                return nested;
            }
        }
    }

    extracted.to_path_buf()
}

/// Turns a cache hit or miss into a ready-to-run server directory.
///
/// ```text
/// Validate → CreateDirectories → AcquireBinary → CloneDefaultResources
///   → WriteMetadata → GenerateServerConfig → GenerateLaunchScript
///   → RegisterInServerRegistry
/// ```
///
/// A failure stops the pipeline. Directories created by earlier steps are
/// left in place.
pub struct Installer {
    source: Arc<dyn ArtifactSource>,
    downloader: Arc<dyn ArchiveDownloader>,
    extractor: Extractor,
    cache: Arc<BinaryCache>,
    registry: Arc<dyn ServerRegistry>,
    metadata: Arc<dyn MetadataStore>,
    config_gen: Arc<dyn ConfigGenerator>,
    resources: DefaultResources,
    temp_root: Option<PathBuf>,
}

impl Installer {
    pub fn new(
        source: Arc<dyn ArtifactSource>,
        downloader: Arc<dyn ArchiveDownloader>,
        cache: Arc<BinaryCache>,
        registry: Arc<dyn ServerRegistry>,
        metadata: Arc<dyn MetadataStore>,
        config_gen: Arc<dyn ConfigGenerator>,
    ) -> Self {
        Self {
            source,
            downloader,
            extractor: Extractor::new(),
            cache,
            registry,
            metadata,
            config_gen,
            resources: DefaultResources::default(),
            temp_root: None,
        }
    }

    /// Use a specific resources provisioner.
    pub fn with_resources(mut self, resources: DefaultResources) -> Self {
        self.resources = resources;
        self
    }

    /// Create per-run download directories under `dir` instead of the system temp dir.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(dir.into());
        self
    }

    pub fn cache(&self) -> &BinaryCache {
        &self.cache
    }

    /// Run the full installation.
    pub fn install(
        &self,
        request: &InstallRequest,
        on_progress: InstallProgressFn<'_>,
    ) -> InkwashResult<InstallResult> {
        let tracker = ProgressTracker::new(on_progress);
        info!(
            server = %request.server_name,
            build = request.build_number,
            path = %request.install_path.display(),
            "Starting installation"
        );

        // 1. Validate
        tracker.step(InstallStep::Validate);
        self.validate(request).map_err(at(InstallStep::Validate))?;
        let folder = unique_folder_name(&request.install_path, &slugify(&request.server_name));
        let server_path = request.install_path.join(folder);
        let binary_path = server_path.join(BIN_DIR);

        // 2. CreateDirectories
        tracker.step(InstallStep::CreateDirectories);
        fs::create_dir_all(&binary_path)
            .map_err(fs_context("create directory", &binary_path))
            .map_err(at(InstallStep::CreateDirectories))?;

        // 3. AcquireBinary
        tracker.step(InstallStep::AcquireBinary);
        let (build, from_cache) = self
            .acquire_binary(request.build_number, &binary_path, &tracker)
            .map_err(at(InstallStep::AcquireBinary))?;

        // 4. CloneDefaultResources
        tracker.step(InstallStep::CloneDefaultResources);
        let resources = self
            .resources
            .provision(&server_path)
            .map_err(at(InstallStep::CloneDefaultResources))?;

        // 5. WriteMetadata
        tracker.step(InstallStep::WriteMetadata);
        let now = Utc::now();
        self.metadata
            .save(&server_path, &ServerMetadata::new(&build, now))
            .map_err(at(InstallStep::WriteMetadata))?;

        let server = Server {
            name: request.server_name.clone(),
            path: server_path,
            binary_path,
            build: build.number,
            build_hash: build.hash.clone(),
            port: request.port,
            created: now,
            auto_start: false,
        };

        // 6. GenerateServerConfig
        tracker.step(InstallStep::GenerateServerConfig);
        self.config_gen
            .generate_server_config(&server, &request.license_key)
            .map_err(at(InstallStep::GenerateServerConfig))?;

        // 7. GenerateLaunchScript
        tracker.step(InstallStep::GenerateLaunchScript);
        self.config_gen
            .generate_launch_script(&server)
            .map_err(at(InstallStep::GenerateLaunchScript))?;

        // 8. RegisterInServerRegistry. Full progress waits for the registry.
        tracker.report(InstallProgress::new(
            InstallStep::RegisterInServerRegistry,
            InstallStep::RegisterInServerRegistry.label(),
            InstallStep::GenerateLaunchScript.anchor(),
        ));
        self.registry
            .add(server.clone())
            .map_err(at(InstallStep::RegisterInServerRegistry))?;

        let mut done = InstallProgress::new(InstallStep::RegisterInServerRegistry, "Installation complete", 1.0);
        done.completed_steps = done.total_steps;
        tracker.report(done);

        info!(
            server = %server.name,
            path = %server.path.display(),
            build = build.number,
            from_cache,
            "Installation complete"
        );

        Ok(InstallResult {
            server,
            build,
            from_cache,
            resources,
        })
    }

    fn validate(&self, request: &InstallRequest) -> InkwashResult<()> {
        if request.server_name.trim().is_empty() {
            return Err(InkwashError::Validation("server name cannot be empty".to_string()));
        }
        if request.port == 0 {
            return Err(InkwashError::Validation("port cannot be 0".to_string()));
        }
        if self.registry.exists(&request.server_name) {
            return Err(InkwashError::Validation(format!(
                "server '{}' already exists",
                request.server_name
            )));
        }

        let install_path = &request.install_path;
        fs::create_dir_all(install_path).map_err(fs_context("create install directory", install_path))?;

        let probe = install_path.join(WRITE_PROBE);
        fs::write(&probe, b"test").map_err(fs_context("write to install directory", install_path))?;
        if let Err(e) = fs::remove_file(&probe) {
            debug!(path = %probe.display(), error = %e, "Could not remove write probe");
        }
        Ok(())
    }

    /// Resolve the build and fill `binary_path`. Returns the build and whether
    /// it came from the cache.
    fn acquire_binary(
        &self,
        build_number: u32,
        binary_path: &Path,
        tracker: &ProgressTracker<'_>,
    ) -> InkwashResult<(Build, bool)> {
        let step = InstallStep::AcquireBinary;
        tracker.report(InstallProgress::new(step, "Fetching build information", DOWNLOAD_START));

        let build = self
            .source
            .fetch_builds()?
            .into_iter()
            .find(|b| b.number == build_number)
            .ok_or(InkwashError::BuildNotFound { build: build_number })?;

        if self.cache.has(build_number) {
            match self.cache.get(build_number) {
                Ok(cached) => {
                    let mut progress = InstallProgress::new(step, "Copying from cache", 0.35);
                    progress.current_file = Some(format!("Build {} (cached)", build_number));
                    tracker.report(progress);

                    let root = resolve_binary_root(&cached);
                    fs_util::copy_dir(&root, binary_path)?;
                    info!(build = build_number, "Installed build from cache");
                    return Ok((build, true));
                }
                Err(e) => {
                    warn!(build = build_number, error = %e, "Cached build unusable, downloading");
                }
            }
        }

        // Per-run directory, removed on drop whether or not the install succeeds.
        let temp_root = self.temp_root.clone().unwrap_or_else(std::env::temp_dir);
        fs::create_dir_all(&temp_root).map_err(fs_context("create directory", &temp_root))?;
        let work = tempfile::Builder::new()
            .prefix("inkwash-download-")
            .tempdir_in(&temp_root)
            .map_err(fs_context("create temp directory in", &temp_root))?;

        let archive = work.path().join(self.source.archive_name());
        let url = self.source.download_url(&build);
        let current_file = format!("Build {}", build_number);

        let on_download = |p: &DownloadProgress| {
            let mut progress = InstallProgress::new(step, "Downloading FXServer", download_progress(p.fraction()));
            progress.download_speed = p.speed_mbs;
            progress.download_eta = p.eta;
            progress.current_file = Some(current_file.clone());
            tracker.report(progress);
        };
        self.downloader.download(&url, &archive, &on_download)?;

        tracker.report(InstallProgress::new(step, "Extracting archive", DOWNLOAD_END));
        let extracted = work.path().join("extracted");
        self.extractor.extract(&archive, &extracted)?;

        let root = resolve_binary_root(&extracted);
        let stats = fs_util::copy_dir(&root, binary_path)?;
        debug!(
            files = stats.files,
            bytes = stats.bytes,
            skipped_links = stats.skipped_links,
            "Build copied into server"
        );

        if let Err(e) = self.cache.add(&build, &archive, &extracted) {
            warn!(build = build_number, error = %e, "Failed to cache build");
        }

        Ok((build, false))
    }
}
