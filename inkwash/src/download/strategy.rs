//! Download strategies.
//!
//! - `SingleConnection`: one GET streamed to disk, with or without a known length
//! - `ParallelChunks`: N concurrent `Range` GETs merged in index order

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use reqwest::blocking::Client;
use reqwest::header::RANGE;
use reqwest::StatusCode;
use tracing::{debug, warn};

use super::http::{send, RemoteFile};
use super::progress::{eta, run_reporter, speed_mbs, ChunkCounters, DownloadProgress};
use crate::error::{fs_context, InkwashError, InkwashResult};
use crate::traits::DownloadProgressFn;

/// Buffer size for reading/writing during downloads (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// How a download will be carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadPlan {
    /// Size unknown: single connection, no ETA.
    Streaming,
    /// Size known but no range support, or only one chunk requested.
    SingleConnection { total: u64 },
    /// Size known and ranges supported.
    Parallel { total: u64, chunks: usize },
    /// Zero-byte resource, nothing to fetch.
    Empty,
}

impl DownloadPlan {
    /// Pick a plan from probe results and the configured chunk count.
    pub(crate) fn select(remote: RemoteFile, chunks: usize) -> Self {
        match remote.total_size {
            None => Self::Streaming,
            Some(0) => Self::Empty,
            Some(total) => {
                let chunks = (chunks as u64).min(total).max(1) as usize;
                if remote.accepts_ranges && chunks > 1 {
                    Self::Parallel { total, chunks }
                } else {
                    Self::SingleConnection { total }
                }
            }
        }
    }
}

/// Split `[0, total)` into `chunks` contiguous ranges; the last absorbs the remainder.
pub fn split_ranges(total: u64, chunks: usize) -> Vec<Range<u64>> {
    if total == 0 || chunks == 0 {
        return Vec::new();
    }
    let chunks = (chunks as u64).min(total);
    let chunk_size = total / chunks;

    (0..chunks)
        .map(|i| {
            let start = i * chunk_size;
            let end = if i == chunks - 1 {
                total
            } else {
                start + chunk_size
            };
            start..end
        })
        .collect()
}

/// Temporary file holding chunk `index` of `dest`.
pub(crate) fn part_path(dest: &Path, index: usize) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(format!(".part{}", index));
    PathBuf::from(name)
}

/// Single-connection download, used for streaming and for servers without ranges.
#[derive(Debug)]
pub(crate) struct SingleConnection {
    pub interval: Duration,
    pub timeout: Duration,
}

impl SingleConnection {
    /// Stream `url` into `dest`. `total` comes from the probe; `None` means an
    /// unbounded stream, reported without a total or ETA even if the GET
    /// itself carries a length.
    pub(crate) fn execute(
        &self,
        client: &Client,
        url: &str,
        dest: &Path,
        total: Option<u64>,
        on_progress: DownloadProgressFn<'_>,
    ) -> InkwashResult<u64> {
        let mut response = send(client.get(url), "downloading", url, self.timeout)?;
        let status = response.status();
        if !status.is_success() {
            return Err(InkwashError::network(
                "downloading",
                url,
                format!("unexpected status {}", status),
            ));
        }

        let file = File::create(dest).map_err(fs_context("create", dest))?;
        let mut writer = BufWriter::new(file);
        let mut buffer = vec![0u8; BUFFER_SIZE];
        let mut downloaded = 0u64;

        let started = Instant::now();
        let mut last_report = started;

        let snapshot = |downloaded: u64| {
            let speed = speed_mbs(downloaded, started.elapsed());
            DownloadProgress {
                total_bytes: total,
                downloaded_bytes: downloaded,
                speed_mbs: speed,
                eta: total.and_then(|t| eta(t.saturating_sub(downloaded), speed)),
                chunk_bytes: vec![downloaded],
            }
        };

        loop {
            let bytes_read = response
                .read(&mut buffer)
                .map_err(|e| InkwashError::network("reading", url, e))?;
            if bytes_read == 0 {
                break;
            }

            writer
                .write_all(&buffer[..bytes_read])
                .map_err(fs_context("write", dest))?;
            downloaded += bytes_read as u64;

            if last_report.elapsed() >= self.interval {
                on_progress(&snapshot(downloaded));
                last_report = Instant::now();
            }
        }

        writer.flush().map_err(fs_context("write", dest))?;

        if let Some(expected) = total {
            if downloaded != expected {
                return Err(InkwashError::network(
                    "downloading",
                    url,
                    format!("expected {} bytes, received {}", expected, downloaded),
                ));
            }
        }

        on_progress(&snapshot(downloaded));
        Ok(downloaded)
    }
}

/// N-way parallel range download.
#[derive(Debug)]
pub(crate) struct ParallelChunks {
    pub chunks: usize,
    pub interval: Duration,
    pub timeout: Duration,
}

impl ParallelChunks {
    /// Download `total` bytes of `url` in parallel chunks and merge them into `dest`.
    pub(crate) fn execute(
        &self,
        client: &Client,
        url: &str,
        dest: &Path,
        total: u64,
        on_progress: DownloadProgressFn<'_>,
    ) -> InkwashResult<u64> {
        let ranges = split_ranges(total, self.chunks);
        let parts: Vec<PathBuf> = (0..ranges.len()).map(|i| part_path(dest, i)).collect();
        let counters = ChunkCounters::new(ranges.len());
        let aborted = AtomicBool::new(false);
        let first_error: Mutex<Option<InkwashError>> = Mutex::new(None);
        let started = Instant::now();

        debug!(url, total, chunks = ranges.len(), "Starting parallel download");

        thread::scope(|scope| {
            let (stop_tx, stop_rx) = mpsc::channel::<()>();
            let counters = &counters;
            let reporter = scope
                .spawn(move || run_reporter(counters, total, self.interval, stop_rx, on_progress));

            let workers: Vec<_> = ranges
                .iter()
                .cloned()
                .enumerate()
                .map(|(index, range)| {
                    let part = &parts[index];
                    let aborted = &aborted;
                    let first_error = &first_error;
                    scope.spawn(move || {
                        let fetch = ChunkFetch {
                            client,
                            url,
                            index,
                            range,
                            total,
                            timeout: self.timeout,
                        };
                        if let Err(e) = fetch.run(part, counters, aborted) {
                            // Only the first failure is reported; siblings stop at their next read.
                            if !aborted.swap(true, Ordering::SeqCst) {
                                *first_error.lock() = Some(e);
                            }
                        }
                    })
                })
                .collect();

            for worker in workers {
                if worker.join().is_err() && !aborted.swap(true, Ordering::SeqCst) {
                    *first_error.lock() = Some(InkwashError::network(
                        "downloading",
                        url,
                        "chunk task panicked",
                    ));
                }
            }

            let _ = stop_tx.send(());
            let _ = reporter.join();
        });

        if let Some(error) = first_error.into_inner() {
            remove_parts(&parts);
            return Err(error);
        }

        let merged = merge_parts(&parts, dest);
        remove_parts(&parts);
        let written = merged?;

        let elapsed = started.elapsed();
        let (chunk_bytes, _) = counters.snapshot();
        on_progress(&DownloadProgress {
            total_bytes: Some(total),
            downloaded_bytes: written,
            speed_mbs: speed_mbs(written, elapsed),
            eta: Some(Duration::ZERO),
            chunk_bytes,
        });

        Ok(written)
    }
}

/// One chunk task.
struct ChunkFetch<'a> {
    client: &'a Client,
    url: &'a str,
    index: usize,
    range: Range<u64>,
    total: u64,
    timeout: Duration,
}

impl ChunkFetch<'_> {
    fn run(&self, part: &Path, counters: &ChunkCounters, aborted: &AtomicBool) -> InkwashResult<()> {
        let url = self.url;
        let expected = self.range.end - self.range.start;
        let header = format!("bytes={}-{}", self.range.start, self.range.end - 1);

        let mut response = send(
            self.client.get(url).header(RANGE, header),
            "downloading chunk of",
            url,
            self.timeout,
        )?;

        let status = response.status();
        let whole_file = self.range.start == 0 && self.range.end == self.total;
        if status != StatusCode::PARTIAL_CONTENT && !(status == StatusCode::OK && whole_file) {
            return Err(InkwashError::network(
                "downloading chunk of",
                url,
                format!("chunk {} got unexpected status {}", self.index, status),
            ));
        }

        let file = File::create(part).map_err(fs_context("create", part))?;
        let mut writer = BufWriter::new(file);
        let mut buffer = vec![0u8; BUFFER_SIZE];
        let mut written = 0u64;

        loop {
            if aborted.load(Ordering::SeqCst) {
                return Ok(());
            }

            let bytes_read = response
                .read(&mut buffer)
                .map_err(|e| InkwashError::network("reading chunk of", url, e))?;
            if bytes_read == 0 {
                break;
            }

            writer
                .write_all(&buffer[..bytes_read])
                .map_err(fs_context("write", part))?;
            written += bytes_read as u64;
            counters.record(self.index, bytes_read as u64);
        }

        writer.flush().map_err(fs_context("write", part))?;

        if written != expected {
            return Err(InkwashError::network(
                "downloading chunk of",
                url,
                format!(
                    "chunk {} expected {} bytes, received {}",
                    self.index, expected, written
                ),
            ));
        }

        Ok(())
    }
}

/// Concatenate part files in index order into `dest`.
fn merge_parts(parts: &[PathBuf], dest: &Path) -> InkwashResult<u64> {
    let file = File::create(dest).map_err(fs_context("create", dest))?;
    let mut writer = BufWriter::new(file);
    let mut total = 0u64;

    for part in parts {
        let mut reader = File::open(part).map_err(fs_context("open", part))?;
        total += io::copy(&mut reader, &mut writer).map_err(fs_context("merge", part))?;
    }

    writer.flush().map_err(fs_context("write", dest))?;
    Ok(total)
}

fn remove_parts(parts: &[PathBuf]) {
    for part in parts {
        if let Err(e) = fs::remove_file(part) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %part.display(), error = %e, "Failed to remove part file");
            }
        }
    }
}
