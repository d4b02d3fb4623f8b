//! Build and platform types for FXServer artifacts.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Listing endpoint for Windows server builds.
pub const WINDOWS_ARTIFACT_URL: &str =
    "https://runtime.fivem.net/artifacts/fivem/build_server_windows/master/";

/// Listing endpoint for Linux server builds.
pub const LINUX_ARTIFACT_URL: &str =
    "https://runtime.fivem.net/artifacts/fivem/build_proot_linux/master/";

/// Target platform of a server build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Linux,
}

impl Platform {
    /// Platform of the running binary.
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Linux
        }
    }

    /// Default listing URL for this platform.
    pub fn listing_url(&self) -> &'static str {
        match self {
            Self::Windows => WINDOWS_ARTIFACT_URL,
            Self::Linux => LINUX_ARTIFACT_URL,
        }
    }

    /// Archive file published for each build on this platform.
    pub fn archive_name(&self) -> &'static str {
        match self {
            Self::Windows => "server.7z",
            Self::Linux => "fx.tar.xz",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Windows => write!(f, "windows"),
            Self::Linux => write!(f, "linux"),
        }
    }
}

/// A remotely available server build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    /// Build number, e.g. `17000`.
    pub number: u32,
    /// Commit hash the build was produced from.
    pub hash: String,
    /// When the build was discovered. The listing carries no real timestamp.
    pub timestamp: DateTime<Utc>,
    /// Flagged as "LATEST RECOMMENDED" on the listing page.
    pub recommended: bool,
    /// Flagged as "LATEST OPTIONAL" on the listing page.
    pub optional: bool,
    /// Archive size in bytes, 0 if unknown.
    pub size: u64,
}

impl Build {
    /// Create a build discovered now.
    pub fn new(number: u32, hash: impl Into<String>) -> Self {
        Self {
            number,
            hash: hash.into(),
            timestamp: Utc::now(),
            recommended: false,
            optional: false,
            size: 0,
        }
    }

    /// Directory segment used by the listing, `{number}-{hash}`.
    pub fn directory_name(&self) -> String {
        format!("{}-{}", self.number, self.hash)
    }

    /// Human-readable label for the build.
    pub fn label(&self) -> &'static str {
        if self.recommended {
            "Recommended"
        } else if self.optional {
            "Optional"
        } else {
            "Latest"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_archive_names() {
        assert_eq!(Platform::Windows.archive_name(), "server.7z");
        assert_eq!(Platform::Linux.archive_name(), "fx.tar.xz");
        assert!(Platform::Linux.listing_url().ends_with('/'));
    }

    #[test]
    fn test_build_label() {
        let mut build = Build::new(17000, "abc");
        assert_eq!(build.label(), "Latest");
        build.optional = true;
        assert_eq!(build.label(), "Optional");
        build.recommended = true;
        assert_eq!(build.label(), "Recommended");
    }

    #[test]
    fn test_build_directory_name() {
        let build = Build::new(22934, "1c490ee35560b652c97a4bfd5a5852cb9f033284");
        assert_eq!(
            build.directory_name(),
            "22934-1c490ee35560b652c97a4bfd5a5852cb9f033284"
        );
    }
}
