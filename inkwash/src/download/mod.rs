//! HTTP download of build archives.
//!
//! This module provides:
//! - Remote size and range-support probing (`http`)
//! - Progress snapshots and the periodic reporter (`progress`)
//! - Single-connection and parallel chunk strategies (`strategy`)
//!
//! # Architecture
//!
//! ```text
//! Downloader (ArchiveDownloader)
//!         │
//!         ├── probe (HEAD, then Range: bytes=0-0)
//!         │
//!         ├── DownloadPlan
//!         │       ├── Empty
//!         │       ├── Streaming / SingleConnection
//!         │       └── Parallel ──► ParallelChunks ──► run_reporter
//!         │
//!         └── DownloadProgress (callback snapshots)
//! ```

mod http;
mod progress;
mod strategy;

use std::fs::File;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, info};

pub use progress::{eta, speed_mbs, DownloadProgress, BYTES_PER_MB, DEFAULT_PROGRESS_INTERVAL};
pub use strategy::{split_ranges, DownloadPlan};

use crate::config::DownloadConfig;
use crate::error::{fs_context, InkwashError, InkwashResult};
use crate::traits::{ArchiveDownloader, DownloadProgressFn};
use strategy::{ParallelChunks, SingleConnection};

/// Default number of parallel chunks.
pub const DEFAULT_CHUNKS: usize = 3;

/// Default per-download HTTP timeout.
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Adaptive archive downloader.
///
/// Uses parallel range requests when the server discloses a size and
/// accepts byte ranges, otherwise falls back to a single connection.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    chunks: usize,
    timeout: Duration,
    interval: Duration,
}

impl Downloader {
    /// Create a downloader with default settings.
    pub fn new() -> InkwashResult<Self> {
        Self::with_settings(DEFAULT_CHUNKS, DEFAULT_DOWNLOAD_TIMEOUT)
    }

    /// Create a downloader with a chunk count and timeout.
    ///
    /// A chunk count of zero is treated as one.
    pub fn with_settings(chunks: usize, timeout: Duration) -> InkwashResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InkwashError::network("building HTTP client for", "downloads", e))?;

        Ok(Self {
            client,
            chunks: chunks.max(1),
            timeout,
            interval: DEFAULT_PROGRESS_INTERVAL,
        })
    }

    /// Create a downloader from the `[download]` configuration section.
    pub fn from_config(config: &DownloadConfig) -> InkwashResult<Self> {
        Self::with_settings(config.chunks, config.timeout)
    }

    /// Set the minimum interval between progress snapshots.
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Configured number of parallel chunks.
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    /// Configured HTTP timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probe `url` and decide how it would be downloaded.
    pub fn plan(&self, url: &str) -> InkwashResult<DownloadPlan> {
        let remote = http::probe(&self.client, url, self.timeout)?;
        Ok(DownloadPlan::select(remote, self.chunks))
    }
}

impl ArchiveDownloader for Downloader {
    fn download(
        &self,
        url: &str,
        dest: &Path,
        on_progress: DownloadProgressFn<'_>,
    ) -> InkwashResult<()> {
        let plan = self.plan(url)?;
        debug!(url, dest = %dest.display(), ?plan, "Download plan selected");

        let single = SingleConnection {
            interval: self.interval,
            timeout: self.timeout,
        };

        let written = match plan {
            DownloadPlan::Empty => {
                File::create(dest).map_err(fs_context("create", dest))?;
                on_progress(&DownloadProgress {
                    total_bytes: Some(0),
                    downloaded_bytes: 0,
                    ..Default::default()
                });
                0
            }
            DownloadPlan::Streaming => single.execute(&self.client, url, dest, None, on_progress)?,
            DownloadPlan::SingleConnection { total } => {
                single.execute(&self.client, url, dest, Some(total), on_progress)?
            }
            DownloadPlan::Parallel { total, chunks } => {
                let parallel = ParallelChunks {
                    chunks,
                    interval: self.interval,
                    timeout: self.timeout,
                };
                parallel.execute(&self.client, url, dest, total, on_progress)?
            }
        };

        info!(url, bytes = written, "Download complete");
        Ok(())
    }
}
