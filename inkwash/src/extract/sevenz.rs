//! `.7z` extraction (Windows server builds).

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sevenz_rust::{Password, SevenZArchiveEntry, SevenZReader};
use tracing::debug;

use super::safety::{create_symlink, set_mode, DirModes, SafeDest};
use crate::error::{fs_context, InkwashError, InkwashResult};

/// Set when the high 16 bits of the Windows attributes carry a Unix mode.
const UNIX_EXTENSION: u32 = 0x8000;
const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

fn open(archive: &Path) -> InkwashResult<SevenZReader<File>> {
    SevenZReader::open(archive, Password::empty()).map_err(|e| InkwashError::extraction(archive, e))
}

/// Unix mode stored in the entry's attributes, if any.
fn unix_mode(entry: &SevenZArchiveEntry) -> Option<u32> {
    if entry.has_windows_attributes && entry.windows_attributes & UNIX_EXTENSION != 0 {
        Some(entry.windows_attributes >> 16)
    } else {
        None
    }
}

pub(super) fn extract(archive: &Path, dest: &SafeDest) -> InkwashResult<usize> {
    let mut reader = open(archive)?;
    let mut dir_modes = DirModes::default();
    let mut written = 0usize;
    let mut failure: Option<InkwashError> = None;

    let result = reader.for_each_entries(|entry, data| {
        match write_entry(archive, dest, entry, data, &mut dir_modes) {
            Ok(true) => {
                written += 1;
                Ok(true)
            }
            Ok(false) => Ok(true),
            Err(e) => {
                failure = Some(e);
                Ok(false)
            }
        }
    });

    if let Some(error) = failure {
        return Err(error);
    }
    result.map_err(|e| InkwashError::extraction(archive, e))?;

    dir_modes.apply()?;
    debug!(archive = %archive.display(), entries = written, "7z extracted");
    Ok(written)
}

/// Write one entry. Returns `false` when the entry names the root and was skipped.
fn write_entry(
    archive: &Path,
    dest: &SafeDest,
    entry: &SevenZArchiveEntry,
    data: &mut dyn Read,
    dir_modes: &mut DirModes,
) -> InkwashResult<bool> {
    let name = entry.name();
    let Some(target) = dest.resolve(name)? else {
        return Ok(false);
    };
    let mode = unix_mode(entry);

    if entry.is_directory() {
        dest.create_dir(name, &target)?;
        if let Some(mode) = mode {
            dir_modes.record(target, mode);
        }
        return Ok(true);
    }

    if mode.is_some_and(|m| m & S_IFMT == S_IFLNK) {
        let mut link = String::new();
        data.read_to_string(&mut link)
            .map_err(|e| InkwashError::extraction(archive, e))?;
        dest.prepare_file(name, &target)?;
        create_symlink(Path::new(&link), &target)?;
        return Ok(true);
    }

    dest.prepare_file(name, &target)?;
    let mut out = File::create(&target).map_err(fs_context("create", &target))?;
    io::copy(data, &mut out).map_err(|e| InkwashError::extraction(archive, e))?;
    if let Some(mode) = mode {
        set_mode(&target, mode)?;
    }
    Ok(true)
}

pub(super) fn entry_count(archive: &Path) -> InkwashResult<usize> {
    let reader = open(archive)?;
    Ok(reader.archive().files.len())
}
