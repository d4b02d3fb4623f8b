//! Inkwash - FiveM server provisioning
//!
//! This library discovers FXServer builds, downloads and extracts their
//! archives, keeps a bounded cache of extracted builds, and lays out new
//! server directories from them.
//!
//! # Modules
//!
//! - [`artifact`]: build listing client and `Build`/`Platform` types
//! - [`download`]: adaptive single/parallel archive downloader
//! - [`extract`]: `.7z`, `.tar.xz` and `.zip` extraction with path confinement
//! - [`cache`]: LRU cache of extracted builds
//! - [`server`]: server registry, per-server metadata and config generation
//! - [`install`]: the installation pipeline tying the above together
//! - [`config`]: `config.ini` loading
//! - [`logging`]: tracing setup

pub mod artifact;
pub mod cache;
pub mod config;
pub mod download;
pub mod error;
pub mod extract;
pub mod fs_util;
pub mod install;
pub mod logging;
pub mod server;
pub mod traits;

pub use artifact::{ArtifactClient, Build, Platform};
pub use cache::BinaryCache;
pub use config::InkwashConfig;
pub use download::{DownloadProgress, Downloader};
pub use error::{ErrorKind, InkwashError, InkwashResult};
pub use extract::{ArchiveFormat, Extractor};
pub use install::{InstallProgress, InstallRequest, InstallResult, InstallStep, Installer};
pub use server::{JsonMetadataStore, JsonRegistry, Server, TemplateConfigGenerator};
