//! `{server}/metadata.json` store.

use std::path::{Path, PathBuf};

use super::types::ServerMetadata;
use crate::error::{InkwashError, InkwashResult};
use crate::fs_util;
use crate::traits::MetadataStore;

/// File name of the per-server metadata document.
pub const SERVER_METADATA_FILE: &str = "metadata.json";

/// Reads and writes `metadata.json` inside server directories.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonMetadataStore;

impl JsonMetadataStore {
    pub fn new() -> Self {
        Self
    }

    pub fn path_for(&self, server_path: &Path) -> PathBuf {
        server_path.join(SERVER_METADATA_FILE)
    }

    pub fn exists(&self, server_path: &Path) -> bool {
        self.path_for(server_path).is_file()
    }

    /// Load a server's metadata. Missing files are an error.
    pub fn load(&self, server_path: &Path) -> InkwashResult<ServerMetadata> {
        let path = self.path_for(server_path);
        fs_util::read_json(&path)?.ok_or_else(|| InkwashError::Metadata {
            path,
            reason: "file not found".to_string(),
        })
    }
}

impl MetadataStore for JsonMetadataStore {
    fn save(&self, server_path: &Path, metadata: &ServerMetadata) -> InkwashResult<()> {
        fs_util::write_json_atomic(&self.path_for(server_path), metadata)
    }
}
