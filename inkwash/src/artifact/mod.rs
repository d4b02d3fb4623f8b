//! Remote FXServer build discovery.
//!
//! - `build`: `Build` and `Platform` types
//! - `client`: HTTP client that scrapes the artifact listing

mod build;
mod client;

pub use build::{Build, Platform, LINUX_ARTIFACT_URL, WINDOWS_ARTIFACT_URL};
pub use client::{parse_listing, ArtifactClient, DEFAULT_LISTING_TIMEOUT};
