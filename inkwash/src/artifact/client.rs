//! HTTP client for the FXServer artifact listing.
//!
//! The listing is a plain HTML directory page, not a documented API. Builds
//! are recovered from archive links of the form `./{number}-{hash}/{archive}`
//! and the "LATEST RECOMMENDED (N)" / "LATEST OPTIONAL (N)" markers in the
//! page text.

use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::Client;
use tracing::{debug, info};

use super::build::{Build, Platform};
use crate::config::DownloadConfig;
use crate::error::{InkwashError, InkwashResult};
use crate::traits::ArtifactSource;

/// Default timeout for listing requests.
pub const DEFAULT_LISTING_TIMEOUT: Duration = Duration::from_secs(30);

fn link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"href\s*=\s*["'](?:\./)?(\d+)-([0-9A-Za-z]+)/(?:server\.7z|fx\.tar\.xz)["']"#)
            .unwrap()
    })
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]*>").unwrap())
}

fn marker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"LATEST (RECOMMENDED|OPTIONAL)\s*\(\s*(\d+)\s*\)").unwrap())
}

/// Client for the platform-specific artifact listing.
#[derive(Debug)]
pub struct ArtifactClient {
    client: Client,
    platform: Platform,
    base_url: String,
    timeout: Duration,
}

impl ArtifactClient {
    /// Create a client for the given platform's official listing.
    pub fn new(platform: Platform) -> InkwashResult<Self> {
        Self::with_base_url(platform, platform.listing_url(), DEFAULT_LISTING_TIMEOUT)
    }

    /// Create a client against a custom listing URL (mirrors, tests).
    pub fn with_base_url(
        platform: Platform,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> InkwashResult<Self> {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InkwashError::network("building HTTP client for", &base_url, e))?;

        Ok(Self {
            client,
            platform,
            base_url,
            timeout,
        })
    }

    /// Create a client from the `[download]` settings, honouring `listing_url`.
    pub fn from_config(platform: Platform, config: &DownloadConfig) -> InkwashResult<Self> {
        let base_url = config
            .listing_url
            .as_deref()
            .unwrap_or_else(|| platform.listing_url());
        Self::with_base_url(platform, base_url, config.listing_timeout)
    }

    /// Platform this client resolves builds for.
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Listing URL this client fetches.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn fetch_listing(&self) -> InkwashResult<String> {
        let url = &self.base_url;
        let response = self.client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                InkwashError::Timeout {
                    url: url.clone(),
                    timeout_secs: self.timeout.as_secs(),
                }
            } else {
                InkwashError::network("fetching artifact listing", url, e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(InkwashError::network(
                "fetching artifact listing",
                url,
                format!("unexpected status {}", status),
            ));
        }

        response
            .text()
            .map_err(|e| InkwashError::network("reading artifact listing", url, e))
    }
}

impl ArtifactSource for ArtifactClient {
    fn fetch_builds(&self) -> InkwashResult<Vec<Build>> {
        debug!(url = %self.base_url, "Fetching artifact listing");
        let html = self.fetch_listing()?;
        let builds = parse_listing(&html);

        if builds.is_empty() {
            return Err(InkwashError::NoBuildsFound {
                url: self.base_url.clone(),
            });
        }

        info!(
            count = builds.len(),
            recommended = ?builds.iter().find(|b| b.recommended).map(|b| b.number),
            "Artifact listing fetched"
        );
        Ok(builds)
    }

    fn download_url(&self, build: &Build) -> String {
        format!(
            "{}{}/{}",
            self.base_url,
            build.directory_name(),
            self.platform.archive_name()
        )
    }

    fn archive_name(&self) -> &str {
        self.platform.archive_name()
    }
}

/// Parse builds out of a listing page.
///
/// Builds are returned in page order, one entry per build number.
pub fn parse_listing(html: &str) -> Vec<Build> {
    let text = tag_pattern().replace_all(html, " ");
    let (recommended, optional) = find_markers(&text);

    let mut seen = HashSet::new();
    let mut builds = Vec::new();

    for caps in link_pattern().captures_iter(html) {
        let Ok(number) = caps[1].parse::<u32>() else {
            continue;
        };
        if !seen.insert(number) {
            continue;
        }

        let mut build = Build::new(number, &caps[2]);
        build.recommended = recommended == Some(number);
        build.optional = optional == Some(number);
        builds.push(build);
    }

    builds
}

/// Find the recommended and optional build numbers in the page text.
fn find_markers(text: &str) -> (Option<u32>, Option<u32>) {
    let mut recommended = None;
    let mut optional = None;

    for caps in marker_pattern().captures_iter(text) {
        let number = caps[2].parse::<u32>().ok();
        match &caps[1] {
            "RECOMMENDED" if recommended.is_none() => recommended = number,
            "OPTIONAL" if optional.is_none() => optional = number,
            _ => {}
        }
    }

    (recommended, optional)
}
