//! Integration tests for archive path confinement.
//!
//! Archives are built by hand with entry names the normal writer APIs would
//! refuse, then fed to the extractor.
//!
//! Run with: `cargo test --test extract_security`

use std::fs::File;
use std::io::Write;
use std::path::Path;

use tempfile::TempDir;

use inkwash::{ErrorKind, Extractor, InkwashError};

// ============================================================================
// Helper Functions
// ============================================================================

/// One hand-built tar entry. `link` fills the raw link-name field.
struct RawEntry<'a> {
    name: &'a str,
    kind: tar::EntryType,
    link: Option<&'a str>,
    data: &'a [u8],
}

impl<'a> RawEntry<'a> {
    fn file(name: &'a str, data: &'a [u8]) -> Self {
        Self {
            name,
            kind: tar::EntryType::Regular,
            link: None,
            data,
        }
    }

    fn link(name: &'a str, kind: tar::EntryType, link: &'a str) -> Self {
        Self {
            name,
            kind,
            link: Some(link),
            data: b"",
        }
    }
}

/// Write a `.tar.xz` with raw entry and link names, bypassing the builder's checks.
fn write_raw_tar_xz_entries(path: &Path, entries: &[RawEntry<'_>]) {
    let encoder = xz2::write::XzEncoder::new(File::create(path).unwrap(), 6);
    let mut builder = tar::Builder::new(encoder);
    for entry in entries {
        let mut header = tar::Header::new_old();
        {
            let raw = header.as_old_mut();
            raw.name.fill(0);
            raw.name[..entry.name.len()].copy_from_slice(entry.name.as_bytes());
            if let Some(link) = entry.link {
                raw.linkname.fill(0);
                raw.linkname[..link.len()].copy_from_slice(link.as_bytes());
            }
        }
        header.set_size(entry.data.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(entry.kind);
        header.set_cksum();
        builder.append(&header, entry.data).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
}

/// Write a `.tar.xz` whose single entry has the raw name `name`.
fn write_raw_tar_xz(path: &Path, name: &str, data: &[u8]) {
    write_raw_tar_xz_entries(path, &[RawEntry::file(name, data)]);
}

/// Write a `.7z` with the given file entries, names taken verbatim.
fn write_sevenz(path: &Path, entries: &[(&str, &[u8])]) {
    let mut writer = sevenz_rust::SevenZWriter::create(path).unwrap();
    for (name, data) in entries {
        let mut entry = sevenz_rust::SevenZArchiveEntry::default();
        entry.name = name.to_string();
        entry.has_stream = true;
        writer.push_archive_entry(entry, Some(*data)).unwrap();
    }
    writer.finish().unwrap();
}

/// Write a `.zip` with the given entries.
fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
    let options = zip::write::SimpleFileOptions::default();
    for (name, data) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap();
}

fn assert_security(err: &InkwashError) {
    assert_eq!(err.kind(), ErrorKind::Security, "unexpected error: {}", err);
}

// ============================================================================
// Traversal
// ============================================================================

#[test]
fn test_tar_xz_parent_traversal_rejected() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("fx.tar.xz");
    write_raw_tar_xz(&archive, "../evil.txt", b"owned");

    let dest = temp.path().join("out");
    let err = Extractor::new().extract(&archive, &dest).unwrap_err();

    assert_security(&err);
    assert!(!temp.path().join("evil.txt").exists());
}

#[test]
fn test_tar_xz_nested_traversal_rejected() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("fx.tar.xz");
    write_raw_tar_xz(&archive, "alpine/../../evil.txt", b"owned");

    let dest = temp.path().join("out");
    let err = Extractor::new().extract(&archive, &dest).unwrap_err();

    assert_security(&err);
    assert!(!temp.path().join("evil.txt").exists());
}

#[test]
fn test_zip_traversal_rejected() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("server.zip");
    write_zip(&archive, &[("../../etc/passwd", b"root::0:0")]);

    let dest = temp.path().join("a/b/out");
    let err = Extractor::new().extract(&archive, &dest).unwrap_err();

    assert_security(&err);
    assert!(!temp.path().join("a/etc/passwd").exists());
}

#[test]
fn test_zip_backslash_traversal_rejected() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("server.zip");
    write_zip(&archive, &[("..\\..\\evil.dll", b"MZ")]);

    let dest = temp.path().join("x/out");
    let err = Extractor::new().extract(&archive, &dest).unwrap_err();

    assert_security(&err);
    assert!(!temp.path().join("evil.dll").exists());
}

#[test]
fn test_sevenz_traversal_rejected() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("server.7z");
    write_sevenz(&archive, &[("../evil.dll", b"MZ")]);

    let dest = temp.path().join("out");
    let err = Extractor::new().extract(&archive, &dest).unwrap_err();

    assert_security(&err);
    assert!(!temp.path().join("evil.dll").exists());
}

#[test]
fn test_sevenz_backslash_traversal_rejected() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("server.7z");
    write_sevenz(&archive, &[("..\\evil.dll", b"MZ")]);

    let dest = temp.path().join("out");
    let err = Extractor::new().extract(&archive, &dest).unwrap_err();

    assert_security(&err);
    assert!(!temp.path().join("evil.dll").exists());
}

// ============================================================================
// Later entries
// ============================================================================

#[test]
fn test_zip_stops_at_first_violation() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("server.zip");
    write_zip(
        &archive,
        &[("ok.txt", b"ok"), ("../../evil", b"owned"), ("after.txt", b"late")],
    );

    let dest = temp.path().join("a/b/out");
    let err = Extractor::new().extract(&archive, &dest).unwrap_err();

    assert_security(&err);
    assert!(dest.join("ok.txt").is_file());
    assert!(!temp.path().join("a/evil").exists());
    assert!(!dest.join("after.txt").exists());
}

#[test]
fn test_tar_xz_stops_at_first_violation() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("fx.tar.xz");
    write_raw_tar_xz_entries(
        &archive,
        &[
            RawEntry::file("ok.txt", b"ok"),
            RawEntry::file("../evil", b"owned"),
            RawEntry::file("after.txt", b"late"),
        ],
    );

    let dest = temp.path().join("out");
    let err = Extractor::new().extract(&archive, &dest).unwrap_err();

    assert_security(&err);
    assert!(!temp.path().join("evil").exists());
    assert!(!dest.join("after.txt").exists());
}

#[test]
fn test_sevenz_stops_at_first_violation() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("server.7z");
    write_sevenz(
        &archive,
        &[("ok.txt", b"ok"), ("../evil", b"owned"), ("after.txt", b"late")],
    );

    let dest = temp.path().join("out");
    let err = Extractor::new().extract(&archive, &dest).unwrap_err();

    assert_security(&err);
    assert!(!temp.path().join("evil").exists());
    assert!(!dest.join("after.txt").exists());
}

// ============================================================================
// Links
// ============================================================================

#[cfg(unix)]
#[test]
fn test_tar_xz_hard_link_through_symlink_rejected() {
    let temp = TempDir::new().unwrap();
    let outside = temp.path().join("outside");
    std::fs::create_dir(&outside).unwrap();
    std::fs::write(outside.join("secret"), b"TOP-SECRET").unwrap();

    let archive = temp.path().join("fx.tar.xz");
    let outside_str = outside.to_str().unwrap();
    write_raw_tar_xz_entries(
        &archive,
        &[
            RawEntry::link("l", tar::EntryType::Symlink, outside_str),
            RawEntry::link("stolen", tar::EntryType::Link, "l/secret"),
        ],
    );

    let dest = temp.path().join("out");
    let err = Extractor::new().extract(&archive, &dest).unwrap_err();

    assert_security(&err);
    assert!(std::fs::symlink_metadata(dest.join("stolen")).is_err());
    assert_eq!(std::fs::read(outside.join("secret")).unwrap(), b"TOP-SECRET");
}

#[cfg(unix)]
#[test]
fn test_tar_xz_hard_link_to_symlink_rejected() {
    let temp = TempDir::new().unwrap();
    let outside = temp.path().join("victim");
    std::fs::write(&outside, b"keep").unwrap();

    let archive = temp.path().join("fx.tar.xz");
    let outside_str = outside.to_str().unwrap();
    write_raw_tar_xz_entries(
        &archive,
        &[
            RawEntry::link("l", tar::EntryType::Symlink, outside_str),
            RawEntry::link("stolen", tar::EntryType::Link, "l"),
        ],
    );

    let dest = temp.path().join("out");
    let err = Extractor::new().extract(&archive, &dest).unwrap_err();

    assert_security(&err);
    assert!(std::fs::symlink_metadata(dest.join("stolen")).is_err());
}

#[test]
fn test_safe_entries_still_extract() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("server.zip");
    write_zip(
        &archive,
        &[
            ("FXServer.exe", b"MZ"),
            ("./citizen/scripting/v8/index.d.ts", b"//"),
        ],
    );

    let dest = temp.path().join("out");
    let count = Extractor::new().extract(&archive, &dest).unwrap();

    assert_eq!(count, 2);
    assert!(dest.join("FXServer.exe").is_file());
    assert!(dest.join("citizen/scripting/v8/index.d.ts").is_file());
}
