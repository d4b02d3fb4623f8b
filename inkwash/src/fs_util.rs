//! Directory tree helpers shared by the cache and the installer.

use std::fs;
use std::io;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{fs_context, InkwashError, InkwashResult};

/// Outcome of a tree copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub files: usize,
    pub bytes: u64,
    /// Symlinks whose target did not exist and were left out.
    pub skipped_links: usize,
}

/// Copy a single file, creating the destination's parent directories.
pub fn copy_file(source: &Path, dest: &Path) -> InkwashResult<u64> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(fs_context("create directory", parent))?;
    }
    fs::copy(source, dest).map_err(fs_context("copy", source))
}

/// Recursively copy `source` into `dest`.
///
/// Symlinks that resolve are recreated verbatim on Unix (and dereferenced
/// elsewhere). Broken symlinks are skipped.
pub fn copy_dir(source: &Path, dest: &Path) -> InkwashResult<CopyStats> {
    let mut stats = CopyStats::default();
    copy_dir_inner(source, dest, &mut stats)?;
    Ok(stats)
}

fn copy_dir_inner(source: &Path, dest: &Path, stats: &mut CopyStats) -> InkwashResult<()> {
    fs::create_dir_all(dest).map_err(fs_context("create directory", dest))?;

    for entry in fs::read_dir(source).map_err(fs_context("read directory", source))? {
        let entry = entry.map_err(fs_context("read directory", source))?;
        let source_path = entry.path();
        let dest_path = dest.join(entry.file_name());
        let file_type = entry
            .file_type()
            .map_err(fs_context("inspect", &source_path))?;

        if file_type.is_symlink() {
            if fs::metadata(&source_path).is_err() {
                debug!(path = %source_path.display(), "Skipping broken symlink");
                stats.skipped_links += 1;
                continue;
            }
            copy_symlink(&source_path, &dest_path, stats)?;
        } else if file_type.is_dir() {
            copy_dir_inner(&source_path, &dest_path, stats)?;
        } else {
            stats.bytes += fs::copy(&source_path, &dest_path).map_err(fs_context("copy", &source_path))?;
            stats.files += 1;
        }
    }

    Ok(())
}

#[cfg(unix)]
fn copy_symlink(source: &Path, dest: &Path, stats: &mut CopyStats) -> InkwashResult<()> {
    let target = fs::read_link(source).map_err(fs_context("read symlink", source))?;
    std::os::unix::fs::symlink(&target, dest).map_err(fs_context("create symlink", dest))?;
    stats.files += 1;
    Ok(())
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, dest: &Path, stats: &mut CopyStats) -> InkwashResult<()> {
    if source.is_dir() {
        copy_dir_inner(source, dest, stats)
    } else {
        stats.bytes += fs::copy(source, dest).map_err(fs_context("copy", source))?;
        stats.files += 1;
        Ok(())
    }
}

/// Move a directory, falling back to copy-then-delete when `rename` fails
/// (typically across filesystems).
pub fn move_dir(source: &Path, dest: &Path) -> InkwashResult<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(fs_context("create directory", parent))?;
    }

    match fs::rename(source, dest) {
        Ok(()) => Ok(()),
        Err(e) => {
            debug!(
                source = %source.display(),
                dest = %dest.display(),
                error = %e,
                "Rename failed, copying instead"
            );
            copy_dir(source, dest)?;
            fs::remove_dir_all(source).map_err(fs_context("remove", source))
        }
    }
}

/// Remove a directory tree, treating "already gone" as success.
pub fn remove_dir_if_exists(path: &Path) -> InkwashResult<bool> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(fs_context("remove", path)(e)),
    }
}

/// Total size of regular files under `path`. Symlinks are not followed.
pub fn dir_size(path: &Path) -> InkwashResult<u64> {
    let meta = fs::symlink_metadata(path).map_err(fs_context("inspect", path))?;
    if !meta.is_dir() {
        return Ok(if meta.is_file() { meta.len() } else { 0 });
    }

    let mut total = 0;
    for entry in fs::read_dir(path).map_err(fs_context("read directory", path))? {
        let entry = entry.map_err(fs_context("read directory", path))?;
        total += dir_size(&entry.path())?;
    }
    Ok(total)
}

/// Serialize `value` as pretty JSON and replace `path` atomically.
///
/// Writes `{path}.tmp` first and renames it over `path`.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> InkwashResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(fs_context("create directory", parent))?;
    }

    let content = serde_json::to_string_pretty(value).map_err(|e| InkwashError::Metadata {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut temp_name = path.as_os_str().to_os_string();
    temp_name.push(".tmp");
    let temp_path = std::path::PathBuf::from(temp_name);

    fs::write(&temp_path, content).map_err(fs_context("write", &temp_path))?;
    fs::rename(&temp_path, path).map_err(fs_context("replace", path))
}

/// Load a JSON document. Returns `None` if the file does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> InkwashResult<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(fs_context("read", path)(e)),
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| InkwashError::Metadata {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}
