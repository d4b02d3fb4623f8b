//! Server records shared by the registry, metadata store and config generator.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::artifact::Build;

/// Current `metadata.json` schema version.
pub const SERVER_METADATA_VERSION: u32 = 1;

/// A registered server installation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub name: String,
    /// Server root directory.
    pub path: PathBuf,
    /// `{path}/bin`, where the FXServer binaries live.
    pub binary_path: PathBuf,
    pub build: u32,
    pub build_hash: String,
    pub port: u16,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub auto_start: bool,
}

/// Per-server `metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerMetadata {
    pub version: u32,
    pub build: BuildMetadata,
    pub lifecycle: LifecycleMetadata,
    #[serde(default)]
    pub stats: UsageStats,
}

/// The FXServer build installed in a server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildMetadata {
    pub number: u32,
    pub hash: String,
    pub installed_at: DateTime<Utc>,
    pub recommended: bool,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleMetadata {
    pub created_at: DateTime<Utc>,
    pub last_started: Option<DateTime<Utc>>,
    pub last_stopped: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    pub restart_count: u32,
    pub total_uptime_secs: u64,
}

impl ServerMetadata {
    /// Metadata for a server freshly installed with `build`.
    pub fn new(build: &Build, now: DateTime<Utc>) -> Self {
        Self {
            version: SERVER_METADATA_VERSION,
            build: BuildMetadata {
                number: build.number,
                hash: build.hash.clone(),
                installed_at: now,
                recommended: build.recommended,
                optional: build.optional,
            },
            lifecycle: LifecycleMetadata {
                created_at: now,
                last_started: None,
                last_stopped: None,
            },
            stats: UsageStats::default(),
        }
    }
}
