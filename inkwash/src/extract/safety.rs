//! Path-traversal protection for archive entries.
//!
//! Every entry goes through two checks before anything is written:
//!
//! 1. A lexical check on the entry name: no absolute paths, drive prefixes,
//!    NUL bytes or `..` components.
//! 2. After the entry's parent directory exists, it is canonicalized and must
//!    still lie under the canonical destination. This catches writes through
//!    symlinks extracted earlier in the same archive.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::{fs_context, InkwashError, InkwashResult};

/// Lexically validate an entry name and return it as a relative path.
///
/// Backslashes are treated as separators so Windows-built archives cannot
/// smuggle `..\` past the check. An empty result means the entry names the
/// root itself (`./`).
pub fn check_entry_name(name: &str) -> Result<PathBuf, String> {
    if name.contains('\0') {
        return Err("name contains a NUL byte".to_string());
    }

    let normalized = name.replace('\\', "/");
    if normalized.starts_with('/') {
        return Err("absolute path".to_string());
    }
    if has_drive_prefix(&normalized) {
        return Err("drive-qualified path".to_string());
    }

    let mut relative = PathBuf::new();
    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir => return Err("parent directory component".to_string()),
            Component::RootDir | Component::Prefix(_) => {
                return Err("absolute path".to_string())
            }
        }
    }

    Ok(relative)
}

fn has_drive_prefix(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Extraction destination with its canonical root.
#[derive(Debug)]
pub(crate) struct SafeDest {
    archive: PathBuf,
    root: PathBuf,
}

impl SafeDest {
    /// Create `dest` if needed and remember its canonical form.
    pub(crate) fn new(archive: &Path, dest: &Path) -> InkwashResult<Self> {
        fs::create_dir_all(dest).map_err(fs_context("create directory", dest))?;
        let root = dest
            .canonicalize()
            .map_err(fs_context("resolve", dest))?;
        Ok(Self {
            archive: archive.to_path_buf(),
            root,
        })
    }

    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    /// Lexically check `name` and map it under the root.
    ///
    /// Returns `None` for entries that name the root itself.
    pub(crate) fn resolve(&self, name: &str) -> InkwashResult<Option<PathBuf>> {
        let relative =
            check_entry_name(name).map_err(|reason| self.violation(name, reason))?;
        if relative.as_os_str().is_empty() {
            return Ok(None);
        }
        Ok(Some(self.root.join(relative)))
    }

    /// Create a directory entry, verifying it resolves under the root.
    pub(crate) fn create_dir(&self, name: &str, target: &Path) -> InkwashResult<()> {
        fs::create_dir_all(target).map_err(fs_context("create directory", target))?;
        self.confine(name, target)
    }

    /// Prepare to write a file, symlink or hard link at `target`.
    ///
    /// Creates and verifies the parent, then removes any symlink already at
    /// `target` so the write cannot follow it.
    pub(crate) fn prepare_file(&self, name: &str, target: &Path) -> InkwashResult<()> {
        let parent = target.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent).map_err(fs_context("create directory", parent))?;
        self.confine(name, parent)?;

        match fs::symlink_metadata(target) {
            Ok(meta) if meta.file_type().is_symlink() || meta.is_file() => {
                fs::remove_file(target).map_err(fs_context("replace", target))
            }
            Ok(meta) if meta.is_dir() => Err(InkwashError::extraction(
                &self.archive,
                format!("entry '{}' would replace a directory", name),
            )),
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(fs_context("inspect", target)(e)),
        }
    }

    /// Resolve the source of a hard-link entry.
    ///
    /// The source must already exist, must not be a symlink, and its
    /// canonical path must lie under the root. Symlinks in the middle of
    /// `link` are followed by the canonicalization, so a link through an
    /// extracted symlink that leaves the tree is rejected.
    pub(crate) fn link_source(&self, name: &str, link: &str) -> InkwashResult<PathBuf> {
        let Some(source) = self.resolve(link)? else {
            return Err(self.violation(name, "hard link to destination root"));
        };
        let meta = fs::symlink_metadata(&source).map_err(fs_context("inspect", &source))?;
        if meta.file_type().is_symlink() {
            return Err(self.violation(name, "hard link to a symlink"));
        }
        self.confine(name, &source)?;
        Ok(source)
    }

    fn confine(&self, name: &str, dir: &Path) -> InkwashResult<()> {
        let canonical = dir.canonicalize().map_err(fs_context("resolve", dir))?;
        if canonical.starts_with(&self.root) {
            Ok(())
        } else {
            Err(self.violation(name, "resolves outside the destination"))
        }
    }

    fn violation(&self, name: &str, reason: impl Into<String>) -> InkwashError {
        InkwashError::security(&self.archive, name, reason)
    }
}

/// Deferred permission updates for directories.
///
/// Directory modes are applied only after every entry is written, so a
/// read-only directory cannot block extraction of its own children.
#[derive(Debug, Default)]
pub(crate) struct DirModes {
    pending: Vec<(PathBuf, u32)>,
}

impl DirModes {
    pub(crate) fn record(&mut self, path: PathBuf, mode: u32) {
        self.pending.push((path, mode));
    }

    pub(crate) fn apply(self) -> InkwashResult<()> {
        for (path, mode) in self.pending.into_iter().rev() {
            set_mode(&path, mode)?;
        }
        Ok(())
    }
}

/// Apply Unix permission bits. No-op elsewhere.
#[cfg(unix)]
pub(crate) fn set_mode(path: &Path, mode: u32) -> InkwashResult<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777))
        .map_err(fs_context("set permissions on", path))
}

#[cfg(not(unix))]
pub(crate) fn set_mode(_path: &Path, _mode: u32) -> InkwashResult<()> {
    Ok(())
}

/// Create a symlink at `path` pointing at `original`, verbatim. Skipped off Unix.
#[cfg(unix)]
pub(crate) fn create_symlink(original: &Path, path: &Path) -> InkwashResult<()> {
    std::os::unix::fs::symlink(original, path).map_err(fs_context("create symlink", path))
}

#[cfg(not(unix))]
pub(crate) fn create_symlink(original: &Path, path: &Path) -> InkwashResult<()> {
    tracing::warn!(
        original = %original.display(),
        path = %path.display(),
        "Symlinks are not extracted on this platform"
    );
    Ok(())
}
