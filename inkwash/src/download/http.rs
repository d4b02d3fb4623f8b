//! HTTP helpers: remote size probing and response validation.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, RANGE};
use reqwest::StatusCode;
use tracing::debug;

use crate::error::{InkwashError, InkwashResult};

/// What a HEAD (or range) probe revealed about a remote file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RemoteFile {
    /// Total size, if the server disclosed it.
    pub total_size: Option<u64>,
    /// Whether the server honours `Range: bytes=` requests.
    pub accepts_ranges: bool,
}

/// Send a request, mapping transport failures to network errors.
pub(crate) fn send(
    request: RequestBuilder,
    operation: &'static str,
    url: &str,
    timeout: Duration,
) -> InkwashResult<Response> {
    request.send().map_err(|e| {
        if e.is_timeout() {
            InkwashError::Timeout {
                url: url.to_string(),
                timeout_secs: timeout.as_secs(),
            }
        } else {
            InkwashError::network(operation, url, e)
        }
    })
}

/// Determine the size of `url` and whether it supports range requests.
///
/// Tries HEAD first. If that yields no `Content-Length`, a `Range: bytes=0-0`
/// GET is issued and the total is read from `Content-Range`.
pub(crate) fn probe(client: &Client, url: &str, timeout: Duration) -> InkwashResult<RemoteFile> {
    let head = send(client.head(url), "probing", url, timeout)?;

    if head.status().is_success() {
        let accepts_ranges = advertises_byte_ranges(head.headers());
        if let Some(total) = header_u64(head.headers(), CONTENT_LENGTH.as_str()) {
            debug!(url, total, accepts_ranges, "HEAD probe succeeded");
            return Ok(RemoteFile {
                total_size: Some(total),
                accepts_ranges,
            });
        }
    } else {
        debug!(url, status = %head.status(), "HEAD probe rejected, trying range probe");
    }

    let response = send(
        client.get(url).header(RANGE, "bytes=0-0"),
        "probing",
        url,
        timeout,
    )?;
    let status = response.status();

    if status == StatusCode::PARTIAL_CONTENT {
        let total = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total);
        debug!(url, ?total, "Range probe succeeded");
        return Ok(RemoteFile {
            total_size: total,
            accepts_ranges: total.is_some(),
        });
    }

    if status.is_success() {
        // The server ignored the range; only a plain Content-Length is left.
        return Ok(RemoteFile {
            total_size: header_u64(response.headers(), CONTENT_LENGTH.as_str()),
            accepts_ranges: false,
        });
    }

    Err(InkwashError::network(
        "probing",
        url,
        format!("unexpected status {}", status),
    ))
}

/// Whether `Accept-Ranges` lists `bytes`.
pub(crate) fn advertises_byte_ranges(headers: &HeaderMap) -> bool {
    headers
        .get(ACCEPT_RANGES)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').any(|unit| unit.trim().eq_ignore_ascii_case("bytes")))
        .unwrap_or(false)
}

/// Parse an unsigned integer header.
pub(crate) fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
}

/// Extract the complete length from a `Content-Range` value.
///
/// `bytes 0-0/1234` and `bytes */1234` yield `1234`; `bytes 0-0/*` yields `None`.
pub(crate) fn parse_content_range_total(value: &str) -> Option<u64> {
    let rest = value.trim().strip_prefix("bytes")?.trim_start();
    let (_, total) = rest.rsplit_once('/')?;
    total.trim().parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_parse_content_range_total() {
        assert_eq!(parse_content_range_total("bytes 0-0/1234"), Some(1234));
        assert_eq!(parse_content_range_total("bytes */98765"), Some(98765));
        assert_eq!(parse_content_range_total("bytes 0-0/*"), None);
        assert_eq!(parse_content_range_total("items 0-0/10"), None);
        assert_eq!(parse_content_range_total(""), None);
    }

    #[test]
    fn test_advertises_byte_ranges() {
        let mut headers = HeaderMap::new();
        assert!(!advertises_byte_ranges(&headers));

        headers.insert(ACCEPT_RANGES, HeaderValue::from_static("none"));
        assert!(!advertises_byte_ranges(&headers));

        headers.insert(ACCEPT_RANGES, HeaderValue::from_static("Bytes"));
        assert!(advertises_byte_ranges(&headers));
    }

    #[test]
    fn test_header_u64() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("4096"));
        assert_eq!(header_u64(&headers, "content-length"), Some(4096));

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("abc"));
        assert_eq!(header_u64(&headers, "content-length"), None);
    }
}
