//! Integration tests for the archive downloader and listing client.
//!
//! These tests run the blocking HTTP clients against a local wiremock
//! server. All blocking work happens inside `spawn_blocking` so the reqwest
//! blocking runtime never nests inside the test's async runtime.
//!
//! Run with: `cargo test --test download_integration`

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use inkwash::artifact::{ArtifactClient, Platform};
use inkwash::download::{DownloadPlan, DownloadProgress, Downloader};
use inkwash::traits::{ArchiveDownloader, ArtifactSource};
use inkwash::{ErrorKind, InkwashError};

// ============================================================================
// Helper Functions
// ============================================================================

/// Serves a fixed body, answering `Range: bytes=a-b` with 206 when enabled.
struct RangeResponder {
    body: Vec<u8>,
    honour_ranges: bool,
    /// Only answer the `bytes=0-0` request with 206, ignore every other range.
    first_byte_only: bool,
    /// Report `*` as the total in `Content-Range`.
    unknown_size: bool,
}

impl RangeResponder {
    fn new(body: Vec<u8>) -> Self {
        Self {
            body,
            honour_ranges: true,
            first_byte_only: false,
            unknown_size: false,
        }
    }

    fn without_ranges(mut self) -> Self {
        self.honour_ranges = false;
        self
    }

    fn first_byte_only(mut self) -> Self {
        self.first_byte_only = true;
        self
    }

    fn unknown_size(mut self) -> Self {
        self.first_byte_only = true;
        self.unknown_size = true;
        self
    }
}

fn parse_range(value: &str) -> Option<(usize, usize)> {
    let spec = value.strip_prefix("bytes=")?;
    let (start, end) = spec.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

impl Respond for RangeResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let range = request
            .headers
            .get("range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_range);

        match range {
            Some((start, end)) if self.honour_ranges && !self.body.is_empty() => {
                if self.first_byte_only && (start, end) != (0, 0) {
                    return ResponseTemplate::new(200).set_body_bytes(self.body.clone());
                }
                let end = end.min(self.body.len() - 1);
                let total = if self.unknown_size {
                    "*".to_string()
                } else {
                    self.body.len().to_string()
                };
                ResponseTemplate::new(206)
                    .insert_header(
                        "content-range",
                        format!("bytes {}-{}/{}", start, end, total).as_str(),
                    )
                    .set_body_bytes(self.body[start..=end].to_vec())
            }
            _ => ResponseTemplate::new(200).set_body_bytes(self.body.clone()),
        }
    }
}

/// Deterministic, non-repeating test payload.
fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

/// Start a server where HEAD is refused, forcing the range probe.
async fn serve(responder: RangeResponder) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fx.tar.xz"))
        .respond_with(responder)
        .mount(&server)
        .await;
    server
}

/// Download `url` into `dest` on a blocking thread, collecting snapshots.
async fn download(
    chunks: usize,
    url: String,
    dest: &Path,
) -> (Result<(), InkwashError>, Vec<DownloadProgress>) {
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let snapshots = Mutex::new(Vec::new());
        let downloader = Downloader::with_settings(chunks, Duration::from_secs(10))
            .unwrap()
            .with_progress_interval(Duration::from_millis(5));
        let result = downloader.download(&url, &dest, &|p: &DownloadProgress| {
            snapshots.lock().unwrap().push(p.clone());
        });
        (result, snapshots.into_inner().unwrap())
    })
    .await
    .unwrap()
}

// ============================================================================
// Downloader
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_parallel_download_reassembles_file() {
    let body = payload(100_003);
    let server = serve(RangeResponder::new(body.clone())).await;
    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("fx.tar.xz");

    let url = format!("{}/fx.tar.xz", server.uri());
    let plan_url = url.clone();
    let plan = tokio::task::spawn_blocking(move || {
        Downloader::with_settings(3, Duration::from_secs(10))
            .unwrap()
            .plan(&plan_url)
            .unwrap()
    })
    .await
    .unwrap();
    assert_eq!(
        plan,
        DownloadPlan::Parallel {
            total: 100_003,
            chunks: 3
        }
    );

    let (result, snapshots) = download(3, url, &dest).await;
    result.unwrap();

    assert_eq!(std::fs::read(&dest).unwrap(), body);
    for i in 0..3 {
        assert!(!temp.path().join(format!("fx.tar.xz.part{}", i)).exists());
    }

    let last = snapshots.last().unwrap();
    assert_eq!(last.total_bytes, Some(100_003));
    assert_eq!(last.downloaded_bytes, 100_003);
    assert_eq!(last.chunk_bytes.iter().sum::<u64>(), 100_003);

    let downloaded: Vec<u64> = snapshots.iter().map(|p| p.downloaded_bytes).collect();
    assert!(downloaded.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_single_connection_when_ranges_ignored() {
    let body = payload(40_000);
    let server = serve(RangeResponder::new(body.clone()).without_ranges()).await;
    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("fx.tar.xz");

    let (result, snapshots) = download(4, format!("{}/fx.tar.xz", server.uri()), &dest).await;
    result.unwrap();

    assert_eq!(std::fs::read(&dest).unwrap(), body);
    let last = snapshots.last().unwrap();
    assert_eq!(last.downloaded_bytes, 40_000);
    assert_eq!(last.total_bytes, Some(40_000));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unknown_size_streams_without_total() {
    let body = payload(70_000);
    let server = serve(RangeResponder::new(body.clone()).unknown_size()).await;
    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("fx.tar.xz");

    let url = format!("{}/fx.tar.xz", server.uri());
    let plan_url = url.clone();
    let plan = tokio::task::spawn_blocking(move || {
        Downloader::with_settings(3, Duration::from_secs(10))
            .unwrap()
            .plan(&plan_url)
            .unwrap()
    })
    .await
    .unwrap();
    assert_eq!(plan, DownloadPlan::Streaming);

    let (result, snapshots) = download(3, url, &dest).await;
    result.unwrap();

    assert_eq!(std::fs::read(&dest).unwrap(), body);
    assert!(!snapshots.is_empty());
    assert!(snapshots.iter().all(|p| p.total_bytes.is_none()));
    assert!(snapshots.iter().all(|p| p.eta.is_none()));
    assert_eq!(snapshots.last().unwrap().downloaded_bytes, 70_000);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_zero_byte_resource_creates_empty_file() {
    let server = serve(RangeResponder::new(Vec::new()).without_ranges()).await;
    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("fx.tar.xz");

    let (result, snapshots) = download(3, format!("{}/fx.tar.xz", server.uri()), &dest).await;
    result.unwrap();

    assert_eq!(std::fs::metadata(&dest).unwrap().len(), 0);
    let last = snapshots.last().unwrap();
    assert_eq!(last.total_bytes, Some(0));
    assert_eq!(last.downloaded_bytes, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_file_is_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("fx.tar.xz");

    let (result, _) = download(3, format!("{}/fx.tar.xz", server.uri()), &dest).await;
    let err = result.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Network);
    assert!(!dest.exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_chunk_without_partial_content_fails_and_cleans_up() {
    let body = payload(30_000);
    let server = serve(RangeResponder::new(body).first_byte_only()).await;
    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("fx.tar.xz");

    let (result, _) = download(3, format!("{}/fx.tar.xz", server.uri()), &dest).await;
    let err = result.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Network);
    assert!(!dest.exists());
    let leftovers: Vec<_> = std::fs::read_dir(temp.path()).unwrap().collect();
    assert!(leftovers.is_empty(), "part files left behind: {:?}", leftovers);
}

// ============================================================================
// Listing client
// ============================================================================

const LISTING: &str = r#"<html><body>
<a href="./17000-8e44e3a2b1c0d9f8e7a6b5c4d3e2f1a0b9c8d7e6/fx.tar.xz">17000</a>
<div>LATEST RECOMMENDED (16900)</div>
<a href="./16900-aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa/fx.tar.xz">16900</a>
<span>LATEST OPTIONAL (17000)</span>
<a href="./16800-bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb/fx.tar.xz">16800</a>
</body></html>"#;

#[tokio::test(flavor = "multi_thread")]
async fn test_listing_client_parses_builds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/artifacts/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LISTING))
        .mount(&server)
        .await;

    let base = format!("{}/artifacts", server.uri());
    let (builds, url) = tokio::task::spawn_blocking(move || {
        let client =
            ArtifactClient::with_base_url(Platform::Linux, base, Duration::from_secs(5)).unwrap();
        let builds = client.fetch_builds().unwrap();
        let url = client.download_url(&builds[0]);
        (builds, url)
    })
    .await
    .unwrap();

    let numbers: Vec<u32> = builds.iter().map(|b| b.number).collect();
    assert_eq!(numbers, vec![17000, 16900, 16800]);
    assert!(builds[1].recommended);
    assert!(builds[0].optional);
    assert!(url.ends_with("/artifacts/17000-8e44e3a2b1c0d9f8e7a6b5c4d3e2f1a0b9c8d7e6/fx.tar.xz"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_listing_without_builds_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let base = server.uri();
    let err = tokio::task::spawn_blocking(move || {
        ArtifactClient::with_base_url(Platform::Linux, base, Duration::from_secs(5))
            .unwrap()
            .fetch_builds()
            .unwrap_err()
    })
    .await
    .unwrap();

    assert!(matches!(err, InkwashError::NoBuildsFound { .. }));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_listing_server_error_is_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let base = server.uri();
    let err = tokio::task::spawn_blocking(move || {
        ArtifactClient::with_base_url(Platform::Windows, base, Duration::from_secs(5))
            .unwrap()
            .fetch_builds()
            .unwrap_err()
    })
    .await
    .unwrap();

    assert_eq!(err.kind(), ErrorKind::Network);
}
