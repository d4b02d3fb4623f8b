//! `.zip` extraction.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use tracing::debug;
use zip::ZipArchive;

use super::safety::{create_symlink, set_mode, DirModes, SafeDest};
use crate::error::{fs_context, InkwashError, InkwashResult};

const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

fn open(archive: &Path) -> InkwashResult<ZipArchive<BufReader<File>>> {
    let file = File::open(archive).map_err(fs_context("open", archive))?;
    ZipArchive::new(BufReader::new(file)).map_err(|e| InkwashError::extraction(archive, e))
}

pub(super) fn extract(archive: &Path, dest: &SafeDest) -> InkwashResult<usize> {
    let mut zip = open(archive)?;
    let mut dir_modes = DirModes::default();
    let mut written = 0usize;

    for index in 0..zip.len() {
        let mut file = zip
            .by_index(index)
            .map_err(|e| InkwashError::extraction(archive, e))?;
        let name = file.name().to_string();

        let Some(target) = dest.resolve(&name)? else {
            continue;
        };
        let mode = file.unix_mode();

        if file.is_dir() {
            dest.create_dir(&name, &target)?;
            if let Some(mode) = mode {
                dir_modes.record(target, mode);
            }
        } else if mode.is_some_and(|m| m & S_IFMT == S_IFLNK) {
            let mut link = String::new();
            io::Read::read_to_string(&mut file, &mut link)
                .map_err(|e| InkwashError::extraction(archive, e))?;
            dest.prepare_file(&name, &target)?;
            create_symlink(Path::new(&link), &target)?;
        } else {
            dest.prepare_file(&name, &target)?;
            let mut out = File::create(&target).map_err(fs_context("create", &target))?;
            io::copy(&mut file, &mut out).map_err(|e| InkwashError::extraction(archive, e))?;
            if let Some(mode) = mode {
                set_mode(&target, mode)?;
            }
        }

        written += 1;
    }

    dir_modes.apply()?;
    debug!(archive = %archive.display(), entries = written, "zip extracted");
    Ok(written)
}

pub(super) fn entry_count(archive: &Path) -> InkwashResult<usize> {
    Ok(open(archive)?.len())
}
