//! `.tar.xz` extraction.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::Path;

use tar::{Archive, EntryType};
use tracing::{debug, trace};
use xz2::read::XzDecoder;

use super::safety::{create_symlink, set_mode, DirModes, SafeDest};
use crate::error::{fs_context, InkwashError, InkwashResult};

fn open(archive: &Path) -> InkwashResult<Archive<XzDecoder<BufReader<File>>>> {
    let file = File::open(archive).map_err(fs_context("open", archive))?;
    Ok(Archive::new(XzDecoder::new(BufReader::new(file))))
}

/// Extract every entry of `archive` into `dest`. Returns the number of entries written.
pub(super) fn extract(archive: &Path, dest: &SafeDest) -> InkwashResult<usize> {
    let mut tar = open(archive)?;
    let entries = tar
        .entries()
        .map_err(|e| InkwashError::extraction(archive, e))?;

    let mut dir_modes = DirModes::default();
    let mut written = 0usize;

    for entry in entries {
        let mut entry = entry.map_err(|e| InkwashError::extraction(archive, e))?;
        let name = entry
            .path()
            .map_err(|e| InkwashError::extraction(archive, e))?
            .to_string_lossy()
            .into_owned();

        let Some(target) = dest.resolve(&name)? else {
            continue;
        };
        let mode = entry.header().mode().ok();
        let kind = entry.header().entry_type();

        match kind {
            EntryType::Directory => {
                dest.create_dir(&name, &target)?;
                if let Some(mode) = mode {
                    dir_modes.record(target, mode);
                }
            }
            EntryType::Regular | EntryType::Continuous => {
                dest.prepare_file(&name, &target)?;
                let mut out = File::create(&target).map_err(fs_context("create", &target))?;
                io::copy(&mut entry, &mut out).map_err(|e| InkwashError::extraction(archive, e))?;
                if let Some(mode) = mode {
                    set_mode(&target, mode)?;
                }
            }
            EntryType::Symlink => {
                let link = entry
                    .link_name()
                    .map_err(|e| InkwashError::extraction(archive, e))?
                    .ok_or_else(|| {
                        InkwashError::extraction(archive, format!("symlink '{}' has no target", name))
                    })?
                    .into_owned();
                dest.prepare_file(&name, &target)?;
                create_symlink(&link, &target)?;
            }
            EntryType::Link => {
                let link = entry
                    .link_name()
                    .map_err(|e| InkwashError::extraction(archive, e))?
                    .ok_or_else(|| {
                        InkwashError::extraction(archive, format!("hard link '{}' has no target", name))
                    })?
                    .to_string_lossy()
                    .into_owned();
                let source = dest.link_source(&name, &link)?;
                dest.prepare_file(&name, &target)?;
                fs::hard_link(&source, &target).map_err(fs_context("link", &target))?;
            }
            other => {
                trace!(entry = %name, kind = ?other, "Skipping unsupported tar entry");
                continue;
            }
        }

        written += 1;
    }

    dir_modes.apply()?;
    debug!(archive = %archive.display(), entries = written, "tar.xz extracted");
    Ok(written)
}

/// Count the entries of `archive` without extracting.
pub(super) fn entry_count(archive: &Path) -> InkwashResult<usize> {
    let mut tar = open(archive)?;
    let entries = tar
        .entries()
        .map_err(|e| InkwashError::extraction(archive, e))?;

    let mut count = 0usize;
    for entry in entries {
        entry.map_err(|e| InkwashError::extraction(archive, e))?;
        count += 1;
    }
    Ok(count)
}
