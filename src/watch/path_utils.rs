// src/watch/path_utils.rs

//! Utility functions for path handling in the watcher.

use std::path::{Path, PathBuf};

/// Forward-slash form of `path` relative to `base`.
///
/// `base` is expected to be canonical already (the watcher canonicalizes the
/// watch directory once). If the direct prefix check fails, the *parent* of
/// `path` is canonicalized and the file name re-attached, so that paths of
/// files that no longer exist (remove events) can still be related to
/// `base` on platforms that report symlinked prefixes such as
/// `/private/var/...`.
///
/// Returns `None` if the path lies outside `base`.
pub fn relative_to(base: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(base) {
        return Some(to_slash(rel));
    }

    let resolved = resolve_via_parent(path)?;
    resolved.strip_prefix(base).ok().map(to_slash)
}

fn resolve_via_parent(path: &Path) -> Option<PathBuf> {
    let parent = path.parent()?.canonicalize().ok()?;
    match path.file_name() {
        Some(name) => Some(parent.join(name)),
        None => Some(parent),
    }
}

fn to_slash(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}
