//! Default collaborators for the installer.
//!
//! - `types`: `Server` and `ServerMetadata` records
//! - `registry`: `JsonRegistry`, the list of known servers
//! - `metadata`: `JsonMetadataStore`, per-server `metadata.json`
//! - `config_gen`: `TemplateConfigGenerator`, `server.cfg` and launch scripts

mod config_gen;
mod metadata;
mod registry;
mod types;

pub use config_gen::{TemplateConfigGenerator, DEFAULT_MAX_CLIENTS};
pub use metadata::{JsonMetadataStore, SERVER_METADATA_FILE};
pub use registry::JsonRegistry;
pub use types::{
    BuildMetadata, LifecycleMetadata, Server, ServerMetadata, UsageStats, SERVER_METADATA_VERSION,
};
