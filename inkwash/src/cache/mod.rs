//! Local cache of extracted server builds.
//!
//! - `binary`: `BinaryCache`, the on-disk LRU store
//! - `metadata`: the persisted `metadata.json` index

mod binary;
mod metadata;

pub use binary::{BinaryCache, DEFAULT_MAX_BUILDS, EXTRACTED_DIR, METADATA_FILE};
pub use metadata::{CacheMetadata, CacheStats, CachedBuild, METADATA_VERSION};
