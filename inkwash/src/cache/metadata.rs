//! Persistent cache index (`metadata.json`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::artifact::Build;

/// Current on-disk format version.
pub const METADATA_VERSION: u32 = 1;

/// One cached build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedBuild {
    pub number: u32,
    pub hash: String,
    #[serde(rename = "downloaded")]
    pub downloaded_at: DateTime<Utc>,
    /// Size of the cached archive in bytes.
    #[serde(rename = "size")]
    pub size_bytes: u64,
    #[serde(default)]
    pub recommended: bool,
    #[serde(default)]
    pub optional: bool,
    pub last_used: DateTime<Utc>,
}

impl CachedBuild {
    /// New entry for `build`, stamped with `now` for both timestamps.
    pub fn new(build: &Build, size_bytes: u64, now: DateTime<Utc>) -> Self {
        Self {
            number: build.number,
            hash: build.hash.clone(),
            downloaded_at: now,
            size_bytes,
            recommended: build.recommended,
            optional: build.optional,
            last_used: now,
        }
    }
}

/// The whole index file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub version: u32,
    #[serde(default)]
    pub builds: Vec<CachedBuild>,
    pub max_builds: usize,
    #[serde(default)]
    pub total_size: u64,
}

impl CacheMetadata {
    pub fn new(max_builds: usize) -> Self {
        Self {
            version: METADATA_VERSION,
            builds: Vec::new(),
            max_builds,
            total_size: 0,
        }
    }

    pub fn find(&self, number: u32) -> Option<&CachedBuild> {
        self.builds.iter().find(|b| b.number == number)
    }

    pub fn find_mut(&mut self, number: u32) -> Option<&mut CachedBuild> {
        self.builds.iter_mut().find(|b| b.number == number)
    }

    /// Remove the row for `number`, keeping `total_size` in step.
    pub fn remove(&mut self, number: u32) -> Option<CachedBuild> {
        let index = self.builds.iter().position(|b| b.number == number)?;
        let removed = self.builds.remove(index);
        self.total_size = self.total_size.saturating_sub(removed.size_bytes);
        Some(removed)
    }

    /// Append a row, keeping `total_size` in step.
    pub fn push(&mut self, build: CachedBuild) {
        self.total_size += build.size_bytes;
        self.builds.push(build);
    }

    /// Drop least-recently-used rows until at most `max_builds` remain.
    ///
    /// Rows are stably sorted by `last_used` first, so ties keep insertion
    /// order. Returns the evicted rows.
    pub fn evict_excess(&mut self) -> Vec<CachedBuild> {
        if self.builds.len() <= self.max_builds {
            return Vec::new();
        }

        self.builds.sort_by_key(|b| b.last_used);
        let excess = self.builds.len() - self.max_builds;
        let evicted: Vec<CachedBuild> = self.builds.drain(..excess).collect();
        for build in &evicted {
            self.total_size = self.total_size.saturating_sub(build.size_bytes);
        }
        evicted
    }

    /// Recompute `total_size` from the rows.
    pub fn recompute_total(&mut self) {
        self.total_size = self.builds.iter().map(|b| b.size_bytes).sum();
    }
}

/// Summary numbers for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub total_builds: usize,
    pub total_size: u64,
    pub max_builds: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn row(number: u32, size: u64, last_used: DateTime<Utc>) -> CachedBuild {
        let mut build = CachedBuild::new(&Build::new(number, "abc"), size, last_used);
        build.last_used = last_used;
        build
    }

    #[test]
    fn test_wire_names() {
        let now = Utc::now();
        let json = serde_json::to_value(row(17000, 42, now)).unwrap();
        assert!(json.get("downloaded").is_some());
        assert_eq!(json["size"], 42);
        assert!(json.get("last_used").is_some());
        assert!(json.get("size_bytes").is_none());
    }

    #[test]
    fn test_push_remove_track_total() {
        let now = Utc::now();
        let mut meta = CacheMetadata::new(3);
        meta.push(row(1, 100, now));
        meta.push(row(2, 50, now));
        assert_eq!(meta.total_size, 150);

        assert_eq!(meta.remove(1).map(|b| b.number), Some(1));
        assert_eq!(meta.total_size, 50);
        assert!(meta.remove(1).is_none());
    }

    #[test]
    fn test_evict_excess_oldest_first() {
        let base = Utc::now();
        let mut meta = CacheMetadata::new(2);
        meta.push(row(1, 10, base + Duration::seconds(5)));
        meta.push(row(2, 20, base));
        meta.push(row(3, 30, base + Duration::seconds(10)));

        let evicted = meta.evict_excess();
        assert_eq!(evicted.iter().map(|b| b.number).collect::<Vec<_>>(), vec![2]);
        assert_eq!(meta.builds.len(), 2);
        assert_eq!(meta.total_size, 40);
    }

    #[test]
    fn test_evict_ties_keep_insertion_order() {
        let now = Utc::now();
        let mut meta = CacheMetadata::new(1);
        meta.push(row(7, 1, now));
        meta.push(row(8, 1, now));

        let evicted = meta.evict_excess();
        assert_eq!(evicted[0].number, 7);
        assert_eq!(meta.builds[0].number, 8);
    }

    #[test]
    fn test_parses_original_layout() {
        let json = r#"{
            "version": 1,
            "builds": [{
                "number": 17000,
                "hash": "8e44e3a",
                "downloaded": "2025-01-02T03:04:05Z",
                "size": 123,
                "recommended": true,
                "optional": false,
                "last_used": "2025-01-03T03:04:05Z"
            }],
            "max_builds": 3,
            "total_size": 123
        }"#;
        let meta: CacheMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.builds[0].size_bytes, 123);
        assert!(meta.builds[0].recommended);
    }
}
