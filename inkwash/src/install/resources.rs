//! Default server resources (cfx-server-data).

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::error::{fs_context, InkwashResult};
use crate::fs_util;

/// Repository the default resources are cloned from.
pub const DEFAULT_RESOURCES_REPOSITORY: &str = "https://github.com/citizenfx/cfx-server-data.git";

/// Directories created when the resources cannot be cloned.
const SKELETON_DIRS: &[&str] = &["resources", "cache", "logs"];

/// How the resources were provisioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourcesOutcome {
    /// `resources/` copied from a fresh clone.
    Cloned,
    /// Clone failed, an empty skeleton was created instead.
    Skeleton,
}

/// Provisions `resources/` in a new server directory.
#[derive(Debug, Clone)]
pub struct DefaultResources {
    repository: String,
    git: PathBuf,
}

impl Default for DefaultResources {
    fn default() -> Self {
        Self::new(DEFAULT_RESOURCES_REPOSITORY)
    }
}

impl DefaultResources {
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            git: PathBuf::from("git"),
        }
    }

    /// Use a specific `git` executable.
    pub fn with_git(mut self, git: impl Into<PathBuf>) -> Self {
        self.git = git.into();
        self
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Clone the repository and copy its `resources/` into `server_path`.
    ///
    /// Any failure of git itself degrades to an empty skeleton. Only errors
    /// writing into `server_path` are returned.
    pub fn provision(&self, server_path: &Path) -> InkwashResult<ResourcesOutcome> {
        match self.clone_resources() {
            Some((_checkout, resources)) => {
                fs_util::copy_dir(&resources, &server_path.join("resources"))?;
                debug!(repository = %self.repository, "Default resources cloned");
                Ok(ResourcesOutcome::Cloned)
            }
            None => {
                for dir in SKELETON_DIRS {
                    let path = server_path.join(dir);
                    fs::create_dir_all(&path).map_err(fs_context("create directory", &path))?;
                }
                Ok(ResourcesOutcome::Skeleton)
            }
        }
    }

    /// Shallow-clone into a temporary directory. Returns the checkout guard
    /// and the path of its `resources/` directory.
    fn clone_resources(&self) -> Option<(tempfile::TempDir, PathBuf)> {
        let checkout = match tempfile::Builder::new().prefix("inkwash-server-data-").tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                warn!(error = %e, "Could not create temp dir for resources clone");
                return None;
            }
        };
        let target = checkout.path().join("repo");

        let status = Command::new(&self.git)
            .args(["clone", "--quiet", "--depth", "1"])
            .arg(&self.repository)
            .arg(&target)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => {}
            Ok(status) => {
                warn!(repository = %self.repository, %status, "git clone failed, creating empty skeleton");
                return None;
            }
            Err(e) => {
                warn!(git = %self.git.display(), error = %e, "git unavailable, creating empty skeleton");
                return None;
            }
        }

        let resources = target.join("resources");
        if !resources.is_dir() {
            warn!(repository = %self.repository, "Clone has no resources/ directory");
            return None;
        }
        Some((checkout, resources))
    }
}
