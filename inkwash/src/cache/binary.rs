//! Bounded LRU cache of extracted server builds.

use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::metadata::{CacheMetadata, CacheStats, CachedBuild};
use crate::artifact::Build;
use crate::error::{fs_context, InkwashError, InkwashResult};
use crate::fs_util;

/// Default number of builds kept on disk.
pub const DEFAULT_MAX_BUILDS: usize = 3;

/// Name of the index file in the cache root.
pub const METADATA_FILE: &str = "metadata.json";

/// Name of the extracted tree inside each build directory.
pub const EXTRACTED_DIR: &str = "extracted";

/// On-disk cache of extracted builds.
///
/// Layout:
///
/// ```text
/// {root}/metadata.json
/// {root}/{number}/{archive}
/// {root}/{number}/extracted/
/// ```
///
/// The index is guarded by an in-process mutex only. Two processes sharing
/// one cache root can race.
#[derive(Debug)]
pub struct BinaryCache {
    root: PathBuf,
    max_builds: usize,
    metadata: Mutex<CacheMetadata>,
}

impl BinaryCache {
    /// Open (or create) the cache at `root`.
    ///
    /// A `max_builds` of zero falls back to [`DEFAULT_MAX_BUILDS`]. Rows whose
    /// `extracted/` directory has disappeared are dropped from the index.
    pub fn open(root: impl Into<PathBuf>, max_builds: usize) -> InkwashResult<Self> {
        let root = root.into();
        let max_builds = if max_builds == 0 {
            DEFAULT_MAX_BUILDS
        } else {
            max_builds
        };

        std::fs::create_dir_all(&root).map_err(fs_context("create directory", &root))?;

        let path = root.join(METADATA_FILE);
        let (mut metadata, mut dirty) = match fs_util::read_json::<CacheMetadata>(&path)? {
            Some(metadata) => (metadata, false),
            None => (CacheMetadata::new(max_builds), true),
        };

        if metadata.max_builds != max_builds {
            metadata.max_builds = max_builds;
            dirty = true;
        }

        let before = metadata.builds.len();
        metadata
            .builds
            .retain(|b| root.join(b.number.to_string()).join(EXTRACTED_DIR).is_dir());
        if metadata.builds.len() != before {
            warn!(
                dropped = before - metadata.builds.len(),
                "Dropped cache entries with missing files"
            );
            dirty = true;
        }

        let total = metadata.total_size;
        metadata.recompute_total();
        dirty |= total != metadata.total_size;

        if dirty {
            fs_util::write_json_atomic(&path, &metadata)?;
        }

        debug!(root = %root.display(), builds = metadata.builds.len(), max_builds, "Cache opened");

        Ok(Self {
            root,
            max_builds,
            metadata: Mutex::new(metadata),
        })
    }

    /// Cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_builds(&self) -> usize {
        self.max_builds
    }

    fn build_dir(&self, number: u32) -> PathBuf {
        self.root.join(number.to_string())
    }

    fn metadata_path(&self) -> PathBuf {
        self.root.join(METADATA_FILE)
    }

    fn save(&self, metadata: &CacheMetadata) -> InkwashResult<()> {
        fs_util::write_json_atomic(&self.metadata_path(), metadata)
    }

    /// Whether build `number` is in the index.
    pub fn has(&self, number: u32) -> bool {
        self.metadata.lock().find(number).is_some()
    }

    /// Path of the extracted tree for `number`, marking it as used.
    pub fn get(&self, number: u32) -> InkwashResult<PathBuf> {
        let mut metadata = self.metadata.lock();
        let extracted = self.build_dir(number).join(EXTRACTED_DIR);

        let Some(row) = metadata.find_mut(number) else {
            return Err(InkwashError::NotCached { build: number });
        };
        if !extracted.is_dir() {
            return Err(InkwashError::NotCached { build: number });
        }

        row.last_used = Utc::now();
        self.save(&metadata)?;
        Ok(extracted)
    }

    /// Add a build from a downloaded archive and its extracted tree.
    ///
    /// The archive is copied into the build directory and the extracted tree
    /// is moved there (copied when a rename is not possible). An existing
    /// entry for the same build number is replaced: its row is dropped from
    /// the saved index first, so a failed replacement leaves the build
    /// uncached rather than indexed without files. Least-recently-used
    /// builds are evicted afterwards so at most `max_builds` remain.
    pub fn add(&self, build: &Build, archive: &Path, extracted: &Path) -> InkwashResult<()> {
        let mut metadata = self.metadata.lock();
        let build_dir = self.build_dir(build.number);
        let dest_extracted = build_dir.join(EXTRACTED_DIR);

        if metadata.remove(build.number).is_some() {
            debug!(build = build.number, "Replacing cached build");
            // The old tree is about to go; the index must not outlive it.
            self.save(&metadata)?;
        }

        std::fs::create_dir_all(&build_dir).map_err(fs_context("create directory", &build_dir))?;

        let archive_name = archive
            .file_name()
            .ok_or_else(|| InkwashError::Validation(format!("{} has no file name", archive.display())))?;
        let dest_archive = build_dir.join(archive_name);
        if archive != dest_archive {
            fs_util::copy_file(archive, &dest_archive)?;
        }

        if extracted != dest_extracted {
            fs_util::remove_dir_if_exists(&dest_extracted)?;
            fs_util::move_dir(extracted, &dest_extracted)?;
        }

        let size = std::fs::metadata(&dest_archive)
            .map_err(fs_context("inspect", &dest_archive))?
            .len();
        metadata.push(CachedBuild::new(build, size, Utc::now()));

        let evicted = metadata.evict_excess();
        self.save(&metadata)?;

        for old in &evicted {
            let dir = self.build_dir(old.number);
            if let Err(e) = fs_util::remove_dir_if_exists(&dir) {
                warn!(build = old.number, error = %e, "Failed to delete evicted build");
            }
        }

        info!(
            build = build.number,
            size,
            evicted = ?evicted.iter().map(|b| b.number).collect::<Vec<_>>(),
            "Build cached"
        );
        Ok(())
    }

    /// Remove build `number`. Returns whether it was in the index.
    pub fn remove(&self, number: u32) -> InkwashResult<bool> {
        let mut metadata = self.metadata.lock();
        let existed = metadata.remove(number).is_some();
        if existed {
            self.save(&metadata)?;
        }
        fs_util::remove_dir_if_exists(&self.build_dir(number))?;
        Ok(existed)
    }

    /// Remove every cached build. Returns how many were removed.
    pub fn clear(&self) -> InkwashResult<usize> {
        let mut metadata = self.metadata.lock();
        let removed: Vec<u32> = metadata.builds.iter().map(|b| b.number).collect();

        metadata.builds.clear();
        metadata.total_size = 0;
        self.save(&metadata)?;

        for number in &removed {
            fs_util::remove_dir_if_exists(&self.build_dir(*number))?;
        }
        Ok(removed.len())
    }

    /// Snapshot of all cached builds.
    pub fn list(&self) -> Vec<CachedBuild> {
        self.metadata.lock().builds.clone()
    }

    pub fn stats(&self) -> CacheStats {
        let metadata = self.metadata.lock();
        CacheStats {
            total_builds: metadata.builds.len(),
            total_size: metadata.total_size,
            max_builds: self.max_builds,
        }
    }
}
