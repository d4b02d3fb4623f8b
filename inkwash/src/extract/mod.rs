//! Archive extraction for FXServer builds.
//!
//! Format is chosen from the file name:
//!
//! | Extension             | Handling                    |
//! |-----------------------|-----------------------------|
//! | `.7z`                 | `sevenz`                    |
//! | `.tar.xz`, `.txz`     | `tar_xz`                    |
//! | `.zip`                | `zipfile`                   |
//! | `.tar.gz`, `.tgz`     | recognized, not implemented |
//!
//! All formats share the path checks in `safety`.

mod safety;
mod sevenz;
mod tar_xz;
mod zipfile;

use std::fmt;
use std::path::Path;

use tracing::info;

pub use safety::check_entry_name;

use crate::error::{InkwashError, InkwashResult};
use safety::SafeDest;

/// Archive formats the extractor knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    SevenZip,
    TarXz,
    Zip,
    TarGz,
}

impl ArchiveFormat {
    /// Detect the format from the archive's file name.
    pub fn from_path(path: &Path) -> InkwashResult<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        if name.ends_with(".7z") {
            Ok(Self::SevenZip)
        } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
            Ok(Self::TarXz)
        } else if name.ends_with(".zip") {
            Ok(Self::Zip)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Ok(Self::TarGz)
        } else {
            Err(InkwashError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SevenZip => "7z",
            Self::TarXz => "tar.xz",
            Self::Zip => "zip",
            Self::TarGz => "tar.gz",
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Detect the format of `path`.
pub fn format_of(path: &Path) -> InkwashResult<ArchiveFormat> {
    ArchiveFormat::from_path(path)
}

/// Safe multi-format archive extractor.
#[derive(Debug, Default, Clone, Copy)]
pub struct Extractor;

impl Extractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract `archive` into `dest`, creating `dest` if needed.
    ///
    /// Returns the number of entries written. Stops at the first entry
    /// that would land outside `dest` with a security error; entries
    /// written before it are left in place.
    pub fn extract(&self, archive: &Path, dest: &Path) -> InkwashResult<usize> {
        let format = ArchiveFormat::from_path(archive)?;
        if format == ArchiveFormat::TarGz {
            return Err(InkwashError::NotImplemented {
                format: format.name(),
                path: archive.to_path_buf(),
            });
        }

        let dest = SafeDest::new(archive, dest)?;
        let written = match format {
            ArchiveFormat::SevenZip => sevenz::extract(archive, &dest)?,
            ArchiveFormat::TarXz => tar_xz::extract(archive, &dest)?,
            ArchiveFormat::Zip => zipfile::extract(archive, &dest)?,
            ArchiveFormat::TarGz => 0,
        };

        info!(
            archive = %archive.display(),
            dest = %dest.root().display(),
            %format,
            entries = written,
            "Archive extracted"
        );
        Ok(written)
    }

    /// Count the entries in `archive` without extracting it.
    pub fn entry_count(&self, archive: &Path) -> InkwashResult<usize> {
        match ArchiveFormat::from_path(archive)? {
            ArchiveFormat::SevenZip => sevenz::entry_count(archive),
            ArchiveFormat::TarXz => tar_xz::entry_count(archive),
            ArchiveFormat::Zip => zipfile::entry_count(archive),
            format @ ArchiveFormat::TarGz => Err(InkwashError::NotImplemented {
                format: format.name(),
                path: archive.to_path_buf(),
            }),
        }
    }
}
