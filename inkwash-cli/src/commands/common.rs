//! Common types and utilities shared across CLI commands.

use std::path::Path;

use inkwash::config::{config_file_path, InkwashConfig};
use inkwash::{BinaryCache, JsonRegistry};

use crate::error::CliError;

/// Load the configuration from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> Result<InkwashConfig, CliError> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config_file_path);
    Ok(InkwashConfig::load_from(&path)?)
}

/// Open the build cache configured in `config`.
pub fn open_cache(config: &InkwashConfig) -> Result<BinaryCache, CliError> {
    Ok(BinaryCache::open(&config.paths.cache, config.cache.max_builds)?)
}

/// Open the server registry configured in `config`.
pub fn open_registry(config: &InkwashConfig) -> Result<JsonRegistry, CliError> {
    Ok(JsonRegistry::open(&config.paths.registry)?)
}

/// Format a byte count for display.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
