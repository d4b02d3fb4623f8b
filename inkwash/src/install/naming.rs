//! Server folder naming.

use std::path::Path;

use chrono::Utc;

/// Folder name used when a server name has no usable characters.
pub const FALLBACK_FOLDER: &str = "fivem-server";

const MAX_SUFFIX: u32 = 100;

/// Turn a server name into a filesystem-safe folder name.
///
/// `"Vexoa Test Server"` becomes `"vexoa-test-server"`. Returns an empty
/// string if nothing alphanumeric remains.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else if c == ' ' || c == '_' || c == '-' {
            pending_hyphen = true;
        }
    }

    slug
}

/// Pick a folder name under `base` that does not exist yet.
///
/// Tries `slug`, then `slug-1` .. `slug-100`, then a timestamp suffix.
pub fn unique_folder_name(base: &Path, slug: &str) -> String {
    let slug = if slug.is_empty() { FALLBACK_FOLDER } else { slug };
    if !base.join(slug).exists() {
        return slug.to_string();
    }

    (1..=MAX_SUFFIX)
        .map(|n| format!("{}-{}", slug, n))
        .find(|candidate| !base.join(candidate).exists())
        .unwrap_or_else(|| format!("{}-{}", slug, Utc::now().timestamp()))
}
