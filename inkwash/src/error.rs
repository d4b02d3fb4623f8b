//! Error types for the acquisition pipeline.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::install::InstallStep;

/// Result type for inkwash operations.
pub type InkwashResult<T> = Result<T, InkwashError>;

/// Broad classification of an [`InkwashError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Listing or download failure. Never retried inside the library.
    Network,
    /// Bad input detected before any destructive action.
    Validation,
    /// mkdir/copy/extract I/O failure. May leave partial directory state.
    Filesystem,
    /// Archive entry tried to escape its destination.
    Security,
    /// Something that was looked up does not exist.
    NotFound,
    /// Archive format that is not (or not yet) handled.
    Unsupported,
    /// Invalid configuration file or settings.
    Config,
}

/// Errors that can occur while fetching, caching and installing builds.
#[derive(Debug, Error)]
pub enum InkwashError {
    /// HTTP request failed or returned an unexpected response.
    #[error("network error while {operation} {url}: {reason}")]
    Network {
        operation: &'static str,
        url: String,
        reason: String,
    },

    /// HTTP request exceeded the client timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// The artifact listing contained no parseable builds.
    #[error("no builds found in artifact listing at {url}")]
    NoBuildsFound { url: String },

    /// The requested build is not present in the remote listing.
    #[error("build {build} not found in artifact listing")]
    BuildNotFound { build: u32 },

    /// The requested build is not present in the local cache.
    #[error("build {build} not found in cache")]
    NotCached { build: u32 },

    /// No server with this name is registered.
    #[error("server '{name}' not found")]
    ServerNotFound { name: String },

    /// Installation input was rejected.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Filesystem operation failed.
    #[error("failed to {operation} {}: {source}", path.display())]
    Filesystem {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Archive entry resolved outside of the extraction root.
    #[error("unsafe archive entry '{entry}' in {}: {reason}", archive.display())]
    Security {
        archive: PathBuf,
        entry: String,
        reason: String,
    },

    /// Archive could not be decoded.
    #[error("failed to extract {}: {reason}", path.display())]
    Extraction { path: PathBuf, reason: String },

    /// Archive extension is not recognized.
    #[error("unsupported archive format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    /// Archive format is recognized but extraction is not implemented.
    #[error("{format} extraction is not implemented: {}", path.display())]
    NotImplemented { format: &'static str, path: PathBuf },

    /// A JSON metadata file (cache index, registry, server metadata) is invalid.
    #[error("invalid metadata file {}: {reason}", path.display())]
    Metadata { path: PathBuf, reason: String },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// An installation step failed.
    #[error("{}: {source}", step.label())]
    Install {
        step: InstallStep,
        #[source]
        source: Box<InkwashError>,
    },
}

impl InkwashError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => ErrorKind::Network,
            Self::NoBuildsFound { .. } | Self::NotCached { .. } | Self::ServerNotFound { .. } => {
                ErrorKind::NotFound
            }
            Self::BuildNotFound { .. } | Self::Validation(_) => ErrorKind::Validation,
            Self::Filesystem { .. } | Self::Extraction { .. } | Self::Metadata { .. } => {
                ErrorKind::Filesystem
            }
            Self::Security { .. } => ErrorKind::Security,
            Self::UnsupportedFormat { .. } | Self::NotImplemented { .. } => ErrorKind::Unsupported,
            Self::Config(_) => ErrorKind::Config,
            Self::Install { source, .. } => source.kind(),
        }
    }

    /// The installation step that failed, if this error came from the installer.
    pub fn failed_step(&self) -> Option<InstallStep> {
        match self {
            Self::Install { step, .. } => Some(*step),
            _ => None,
        }
    }

    pub(crate) fn network(
        operation: &'static str,
        url: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::Network {
            operation,
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn security(archive: &Path, entry: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Security {
            archive: archive.to_path_buf(),
            entry: entry.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn extraction(path: &Path, reason: impl ToString) -> Self {
        Self::Extraction {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

/// Build a `map_err` adapter that attaches an operation and path to an I/O error.
pub(crate) fn fs_context<'a>(
    operation: &'static str,
    path: &'a Path,
) -> impl FnOnce(io::Error) -> InkwashError + 'a {
    move |source| InkwashError::Filesystem {
        operation,
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = InkwashError::BuildNotFound { build: 99999 };
        assert_eq!(err.to_string(), "build 99999 not found in artifact listing");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_filesystem_error_keeps_source() {
        let err = fs_context("create directory", Path::new("/srv/x"))(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert!(err.to_string().contains("create directory /srv/x"));
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.kind(), ErrorKind::Filesystem);
    }

    #[test]
    fn test_install_error_delegates_kind() {
        let err = InkwashError::Install {
            step: InstallStep::AcquireBinary,
            source: Box::new(InkwashError::security(Path::new("a.zip"), "../x", "escapes")),
        };
        assert_eq!(err.kind(), ErrorKind::Security);
        assert_eq!(err.failed_step(), Some(InstallStep::AcquireBinary));
        assert!(err.to_string().contains("escapes"));
    }
}
