//! Server installation.
//!
//! - `installer`: the eight-step `Installer` pipeline
//! - `progress`: `InstallStep`, `InstallProgress` and monotonic reporting
//! - `naming`: server folder slugs
//! - `resources`: default resources clone with skeleton fallback

mod installer;
mod naming;
mod progress;
mod resources;

pub use installer::{
    resolve_binary_root, InstallRequest, InstallResult, Installer, BIN_DIR, DEFAULT_PORT,
};
pub use naming::{slugify, unique_folder_name, FALLBACK_FOLDER};
pub use progress::{InstallProgress, InstallProgressFn, InstallStep, TOTAL_STEPS};
pub use resources::{DefaultResources, ResourcesOutcome, DEFAULT_RESOURCES_REPOSITORY};
