//! Seams between the installer and the components it drives.
//!
//! The installer only depends on these traits, so tests can substitute
//! in-memory fakes and the CLI can wire up the real implementations.

use std::path::Path;

use crate::artifact::Build;
use crate::download::DownloadProgress;
use crate::error::InkwashResult;
use crate::server::{Server, ServerMetadata};

/// Callback invoked with download progress snapshots.
pub type DownloadProgressFn<'a> = &'a (dyn Fn(&DownloadProgress) + Sync);

/// Source of remotely available builds.
pub trait ArtifactSource: Send + Sync {
    /// Fetch the current list of builds.
    fn fetch_builds(&self) -> InkwashResult<Vec<Build>>;

    /// Download URL of the archive for `build`.
    fn download_url(&self, build: &Build) -> String;

    /// File name of the archive published for each build.
    fn archive_name(&self) -> &str;
}

/// Fetches a single archive over the network.
pub trait ArchiveDownloader: Send + Sync {
    /// Download `url` into `dest`, reporting progress along the way.
    fn download(
        &self,
        url: &str,
        dest: &Path,
        on_progress: DownloadProgressFn<'_>,
    ) -> InkwashResult<()>;
}

/// Registry of known servers.
pub trait ServerRegistry: Send + Sync {
    /// Whether a server with this name is already registered.
    fn exists(&self, name: &str) -> bool;

    /// Register a new server.
    fn add(&self, server: Server) -> InkwashResult<()>;
}

/// Persists per-server build and lifecycle metadata.
pub trait MetadataStore: Send + Sync {
    /// Write metadata into the server directory.
    fn save(&self, server_path: &Path, metadata: &ServerMetadata) -> InkwashResult<()>;
}

/// Generates configuration and launch scripts for a server.
pub trait ConfigGenerator: Send + Sync {
    /// Write `server.cfg`. The license key is consumed opaquely.
    fn generate_server_config(&self, server: &Server, license_key: &str) -> InkwashResult<()>;

    /// Write the platform launch script referencing `bin/`.
    fn generate_launch_script(&self, server: &Server) -> InkwashResult<()>;
}
