//! Filesystem and URL path helpers.

use std::path::{Component, Path, PathBuf};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first, then falls back to joining relative paths
/// with the current directory.
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// Resolve a user-supplied path: absolute as-is, cwd-relative if it exists,
/// otherwise relative to `fallback_dir`.
#[inline]
pub fn resolve_path(path: &Path, fallback_dir: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    if path.exists() {
        return normalize_path(path);
    }
    normalize_path(&fallback_dir.join(path))
}

/// `path` relative to `base`, joined with `/` regardless of platform.
pub fn relative_slash(path: &Path, base: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Normalize a URL path: resolve `.` and `..`, collapse slashes, and keep a
/// trailing slash unless the last segment has an extension.
pub fn clean_url(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    if segments.is_empty() {
        return "/".to_owned();
    }

    let mut out = String::with_capacity(path.len() + 2);
    for segment in &segments {
        out.push('/');
        out.push_str(segment);
    }
    if !segments.last().is_some_and(|s| s.contains('.')) {
        out.push('/');
    }
    out
}
