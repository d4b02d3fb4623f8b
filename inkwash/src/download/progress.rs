//! Progress reporting for archive downloads.
//!
//! Chunk threads record bytes into a shared, mutex-guarded counter vector.
//! A dedicated reporter thread wakes every tick, recomputes the total from
//! those per-chunk counters and invokes the callback with a snapshot.

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Bytes per megabyte used for speed reporting.
pub const BYTES_PER_MB: f64 = 1_048_576.0;

/// Default interval between progress snapshots.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Snapshot of an in-flight download.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DownloadProgress {
    /// Expected size, `None` while streaming without a known length.
    pub total_bytes: Option<u64>,
    /// Bytes written so far across all chunks.
    pub downloaded_bytes: u64,
    /// Current throughput in MB/s.
    pub speed_mbs: f64,
    /// Estimated time remaining, only when the total is known and speed > 0.
    pub eta: Option<Duration>,
    /// Bytes written per chunk.
    pub chunk_bytes: Vec<u64>,
}

impl DownloadProgress {
    /// Fraction complete in `[0, 1]`, if the total is known.
    pub fn fraction(&self) -> Option<f64> {
        match self.total_bytes {
            Some(0) => Some(1.0),
            Some(total) => Some((self.downloaded_bytes as f64 / total as f64).min(1.0)),
            None => None,
        }
    }
}

/// Throughput in MB/s for `bytes` transferred over `elapsed`.
pub fn speed_mbs(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    bytes as f64 / secs / BYTES_PER_MB
}

/// Time to transfer `remaining` bytes at `speed_mbs`, if speed is positive.
pub fn eta(remaining: u64, speed_mbs: f64) -> Option<Duration> {
    if speed_mbs <= 0.0 || !speed_mbs.is_finite() {
        return None;
    }
    Some(Duration::from_secs_f64(
        remaining as f64 / (speed_mbs * BYTES_PER_MB),
    ))
}

/// Authoritative per-chunk byte counters.
#[derive(Debug)]
pub(crate) struct ChunkCounters {
    chunks: Mutex<Vec<u64>>,
}

impl ChunkCounters {
    pub(crate) fn new(num_chunks: usize) -> Self {
        Self {
            chunks: Mutex::new(vec![0; num_chunks]),
        }
    }

    /// Add `bytes` to the counter of chunk `index`.
    pub(crate) fn record(&self, index: usize, bytes: u64) {
        let mut chunks = self.chunks.lock();
        if let Some(counter) = chunks.get_mut(index) {
            *counter += bytes;
        }
    }

    /// Copy of all counters and their sum, taken under one lock.
    pub(crate) fn snapshot(&self) -> (Vec<u64>, u64) {
        let chunks = self.chunks.lock();
        let total = chunks.iter().sum();
        (chunks.clone(), total)
    }
}

/// Computes interval speed between consecutive ticks.
#[derive(Debug)]
pub(crate) struct SpeedTracker {
    last_bytes: u64,
    last_tick: Instant,
}

impl SpeedTracker {
    pub(crate) fn new(now: Instant) -> Self {
        Self {
            last_bytes: 0,
            last_tick: now,
        }
    }

    /// Speed since the previous tick. Returns `None` if no time has passed.
    pub(crate) fn tick(&mut self, total: u64, now: Instant) -> Option<f64> {
        let elapsed = now.saturating_duration_since(self.last_tick);
        if elapsed.is_zero() {
            return None;
        }
        let delta = total.saturating_sub(self.last_bytes);
        self.last_bytes = total;
        self.last_tick = now;
        Some(speed_mbs(delta, elapsed))
    }
}

/// Reporter loop for parallel downloads.
///
/// Runs until a message arrives on `stop` or the sender is dropped.
pub(crate) fn run_reporter(
    counters: &ChunkCounters,
    total_bytes: u64,
    interval: Duration,
    stop: Receiver<()>,
    on_progress: &(dyn Fn(&DownloadProgress) + Sync),
) {
    let mut tracker = SpeedTracker::new(Instant::now());
    let mut speed = 0.0;

    loop {
        match stop.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }

        let (chunk_bytes, downloaded) = counters.snapshot();
        if let Some(current) = tracker.tick(downloaded, Instant::now()) {
            speed = current;
        }

        on_progress(&DownloadProgress {
            total_bytes: Some(total_bytes),
            downloaded_bytes: downloaded,
            speed_mbs: speed,
            eta: eta(total_bytes.saturating_sub(downloaded), speed),
            chunk_bytes,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;

    #[test]
    fn test_speed_mbs() {
        let speed = speed_mbs(2 * 1_048_576, Duration::from_secs(1));
        assert!((speed - 2.0).abs() < f64::EPSILON);
        assert_eq!(speed_mbs(100, Duration::ZERO), 0.0);
    }

    #[test]
    fn test_eta() {
        let remaining = 10 * 1_048_576;
        assert_eq!(eta(remaining, 2.0), Some(Duration::from_secs(5)));
        assert_eq!(eta(remaining, 0.0), None);
    }

    #[test]
    fn test_fraction() {
        let mut progress = DownloadProgress {
            total_bytes: Some(200),
            downloaded_bytes: 50,
            ..Default::default()
        };
        assert_eq!(progress.fraction(), Some(0.25));

        progress.total_bytes = None;
        assert_eq!(progress.fraction(), None);

        progress.total_bytes = Some(0);
        assert_eq!(progress.fraction(), Some(1.0));
    }

    #[test]
    fn test_chunk_counters_sum() {
        let counters = ChunkCounters::new(3);
        counters.record(0, 500);
        counters.record(2, 300);
        counters.record(0, 10);
        counters.record(7, 999);

        let (chunks, total) = counters.snapshot();
        assert_eq!(chunks, vec![510, 0, 300]);
        assert_eq!(total, 810);
    }

    #[test]
    fn test_speed_tracker_uses_deltas() {
        let start = Instant::now();
        let mut tracker = SpeedTracker::new(start);

        let first = tracker.tick(1_048_576, start + Duration::from_secs(1)).unwrap();
        assert!((first - 1.0).abs() < 1e-9);

        let second = tracker
            .tick(1_048_576 * 5, start + Duration::from_secs(3))
            .unwrap();
        assert!((second - 2.0).abs() < 1e-9);

        assert!(tracker.tick(0, start + Duration::from_secs(3)).is_none());
    }

    #[test]
    fn test_reporter_is_monotonic_and_stops() {
        let counters = ChunkCounters::new(2);
        let seen = Mutex::new(Vec::new());
        let (stop_tx, stop_rx) = mpsc::channel();

        thread::scope(|scope| {
            let reporter = scope.spawn(|| {
                run_reporter(
                    &counters,
                    1000,
                    Duration::from_millis(5),
                    stop_rx,
                    &|p: &DownloadProgress| seen.lock().push(p.downloaded_bytes),
                )
            });

            for _ in 0..20 {
                counters.record(0, 10);
                counters.record(1, 15);
                thread::sleep(Duration::from_millis(2));
            }

            stop_tx.send(()).unwrap();
            reporter.join().unwrap();
        });

        let seen = seen.into_inner();
        assert!(!seen.is_empty());
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }
}
