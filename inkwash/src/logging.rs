//! Tracing setup.
//!
//! Everything at the filter level goes to `{logs}/inkwash.log` through a
//! non-blocking writer. Warnings and errors are also echoed to stderr.
//! The filter is read from `RUST_LOG`, falling back to `info` (or `debug`
//! when verbose).

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::{fs_context, InkwashError, InkwashResult};

/// Log file name inside the logs directory.
pub const LOG_FILE_NAME: &str = "inkwash.log";

/// Keeps the background log writer alive. Dropping it flushes pending lines.
pub struct LoggingGuard {
    _guard: WorkerGuard,
    log_file: PathBuf,
}

impl LoggingGuard {
    /// Path of the log file being written.
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Install the global subscriber.
///
/// Fails if the logs directory cannot be created or a global subscriber is
/// already installed.
pub fn init(logs_dir: &Path, verbose: bool) -> InkwashResult<LoggingGuard> {
    std::fs::create_dir_all(logs_dir).map_err(fs_context("create directory", logs_dir))?;

    let file_appender = tracing_appender::rolling::never(logs_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true)
        .with_filter(env_filter);

    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(LevelFilter::WARN);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| InkwashError::Config(format!("failed to initialise logging: {}", e)))?;

    Ok(LoggingGuard {
        _guard: guard,
        log_file: logs_dir.join(LOG_FILE_NAME),
    })
}
