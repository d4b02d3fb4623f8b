//! Configuration file (`~/.inkwash/config.ini`).
//!
//! ```ini
//! [paths]
//! servers = ~/FiveM
//! cache = ~/.inkwash/cache
//! logs = ~/.inkwash/logs
//! registry = ~/.inkwash/servers.json
//!
//! [cache]
//! max_builds = 3
//!
//! [download]
//! chunks = 3
//! timeout_secs = 600
//! listing_timeout_secs = 30
//! ; listing_url = https://mirror.example/artifacts/
//!
//! [defaults]
//! port = 30120
//!
//! [resources]
//! repository = https://github.com/citizenfx/cfx-server-data.git
//! ```
//!
//! A missing file yields defaults. Missing keys fall back to their defaults;
//! keys that are present but unparsable are errors.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};
use tracing::debug;

use crate::artifact::DEFAULT_LISTING_TIMEOUT;
use crate::cache::DEFAULT_MAX_BUILDS;
use crate::download::{DEFAULT_CHUNKS, DEFAULT_DOWNLOAD_TIMEOUT};
use crate::error::{fs_context, InkwashError, InkwashResult};
use crate::install::{DEFAULT_PORT, DEFAULT_RESOURCES_REPOSITORY};

/// Name of the configuration directory under the home directory.
pub const CONFIG_DIR_NAME: &str = ".inkwash";

/// Name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// `~/.inkwash`, or `./.inkwash` when no home directory is known.
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// Default configuration file path.
pub fn config_file_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// Expand a leading `~/` to the home directory.
fn expand_home(value: &str) -> PathBuf {
    match (value.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(value),
    }
}

/// `[paths]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathsConfig {
    /// Default parent directory for new servers.
    pub servers: PathBuf,
    pub cache: PathBuf,
    pub logs: PathBuf,
    /// Server registry JSON file.
    pub registry: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let base = config_dir();
        Self {
            servers: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("FiveM"),
            cache: base.join("cache"),
            logs: base.join("logs"),
            registry: base.join("servers.json"),
        }
    }
}

/// `[cache]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub max_builds: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_builds: DEFAULT_MAX_BUILDS,
        }
    }
}

/// `[download]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadConfig {
    pub chunks: usize,
    pub timeout: Duration,
    pub listing_timeout: Duration,
    /// Overrides the platform's official listing URL.
    pub listing_url: Option<String>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            chunks: DEFAULT_CHUNKS,
            timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            listing_timeout: DEFAULT_LISTING_TIMEOUT,
            listing_url: None,
        }
    }
}

/// `[defaults]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultsConfig {
    pub port: u16,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

/// `[resources]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcesConfig {
    pub repository: String,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            repository: DEFAULT_RESOURCES_REPOSITORY.to_string(),
        }
    }
}

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InkwashConfig {
    pub paths: PathsConfig,
    pub cache: CacheConfig,
    pub download: DownloadConfig,
    pub defaults: DefaultsConfig,
    pub resources: ResourcesConfig,
}

/// Parse `section.key` if present.
fn parse_key<T: FromStr>(props: Option<&Properties>, section: &str, key: &str) -> InkwashResult<Option<T>>
where
    T::Err: std::fmt::Display,
{
    let Some(raw) = props.and_then(|p| p.get(key)) else {
        return Ok(None);
    };
    raw.trim().parse::<T>().map(Some).map_err(|e| {
        InkwashError::Config(format!("{}.{} = '{}': {}", section, key, raw, e))
    })
}

impl InkwashConfig {
    /// Load from the default path.
    pub fn load() -> InkwashResult<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`. A missing file yields defaults.
    pub fn load_from(path: &Path) -> InkwashResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)
            .map_err(|e| InkwashError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_ini(&ini)
    }

    /// Build a configuration from parsed INI data.
    pub fn from_ini(ini: &Ini) -> InkwashResult<Self> {
        let mut config = Self::default();

        let paths = ini.section(Some("paths"));
        if let Some(value) = paths.and_then(|p| p.get("servers")) {
            config.paths.servers = expand_home(value.trim());
        }
        if let Some(value) = paths.and_then(|p| p.get("cache")) {
            config.paths.cache = expand_home(value.trim());
        }
        if let Some(value) = paths.and_then(|p| p.get("logs")) {
            config.paths.logs = expand_home(value.trim());
        }
        if let Some(value) = paths.and_then(|p| p.get("registry")) {
            config.paths.registry = expand_home(value.trim());
        }

        let cache = ini.section(Some("cache"));
        if let Some(max_builds) = parse_key(cache, "cache", "max_builds")? {
            config.cache.max_builds = max_builds;
        }

        let download = ini.section(Some("download"));
        if let Some(chunks) = parse_key::<usize>(download, "download", "chunks")? {
            if chunks == 0 {
                return Err(InkwashError::Config("download.chunks must be at least 1".to_string()));
            }
            config.download.chunks = chunks;
        }
        if let Some(secs) = parse_key(download, "download", "timeout_secs")? {
            config.download.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_key(download, "download", "listing_timeout_secs")? {
            config.download.listing_timeout = Duration::from_secs(secs);
        }
        if let Some(url) = download.and_then(|p| p.get("listing_url")) {
            let url = url.trim();
            if !url.is_empty() {
                config.download.listing_url = Some(url.to_string());
            }
        }

        let defaults = ini.section(Some("defaults"));
        if let Some(port) = parse_key(defaults, "defaults", "port")? {
            config.defaults.port = port;
        }

        if let Some(repository) = ini.section(Some("resources")).and_then(|p| p.get("repository")) {
            config.resources.repository = repository.trim().to_string();
        }

        Ok(config)
    }

    /// Render as INI.
    pub fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        ini.with_section(Some("paths"))
            .set("servers", self.paths.servers.to_string_lossy())
            .set("cache", self.paths.cache.to_string_lossy())
            .set("logs", self.paths.logs.to_string_lossy())
            .set("registry", self.paths.registry.to_string_lossy());
        ini.with_section(Some("cache"))
            .set("max_builds", self.cache.max_builds.to_string());
        ini.with_section(Some("download"))
            .set("chunks", self.download.chunks.to_string())
            .set("timeout_secs", self.download.timeout.as_secs().to_string())
            .set(
                "listing_timeout_secs",
                self.download.listing_timeout.as_secs().to_string(),
            );
        if let Some(url) = &self.download.listing_url {
            ini.with_section(Some("download")).set("listing_url", url.as_str());
        }
        ini.with_section(Some("defaults"))
            .set("port", self.defaults.port.to_string());
        ini.with_section(Some("resources"))
            .set("repository", self.resources.repository.as_str());
        ini
    }

    /// Write to `path`, creating its parent directory.
    pub fn save_to(&self, path: &Path) -> InkwashResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(fs_context("create directory", parent))?;
        }
        self.to_ini()
            .write_to_file(path)
            .map_err(fs_context("write", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = InkwashConfig::load_from(&temp.path().join("absent.ini")).unwrap();

        assert_eq!(config.cache.max_builds, 3);
        assert_eq!(config.download.chunks, 3);
        assert_eq!(config.download.timeout, Duration::from_secs(600));
        assert_eq!(config.download.listing_timeout, Duration::from_secs(30));
        assert_eq!(config.defaults.port, 30120);
    }

    #[test]
    fn test_partial_file_overrides() {
        let ini = Ini::load_from_str(
            "[cache]\nmax_builds = 5\n[download]\nchunks=8\nlisting_url = http://mirror.local/\n[paths]\ncache = /var/cache/inkwash\n",
        )
        .unwrap();
        let config = InkwashConfig::from_ini(&ini).unwrap();

        assert_eq!(config.cache.max_builds, 5);
        assert_eq!(config.download.chunks, 8);
        assert_eq!(config.download.listing_url.as_deref(), Some("http://mirror.local/"));
        assert_eq!(config.paths.cache, PathBuf::from("/var/cache/inkwash"));
        assert_eq!(config.defaults.port, 30120);
    }

    #[test]
    fn test_bad_number_is_config_error() {
        let ini = Ini::load_from_str("[defaults]\nport = seventy\n").unwrap();
        let err = InkwashConfig::from_ini(&ini).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("defaults.port"));

        let ini = Ini::load_from_str("[download]\nchunks = 0\n").unwrap();
        assert!(InkwashConfig::from_ini(&ini).is_err());
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/config.ini");

        let mut config = InkwashConfig::default();
        config.cache.max_builds = 7;
        config.defaults.port = 30200;
        config.save_to(&path).unwrap();

        assert_eq!(InkwashConfig::load_from(&path).unwrap(), config);
    }
}
