//! Common utilities shared across CLI commands.

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use jwalk::WalkDir;
use rayon::prelude::*;

use crate::config::FolioConfig;
use crate::core::ContentKind;
use crate::debug;
use crate::page::Page;
use crate::site::{Permalinks, SiteDocument};
use crate::utils::path::{relative_slash, resolve_path};

/// Files never treated as content.
const IGNORED_FILES: &[&str] = &[".DS_Store", "Thumbs.db"];

/// All regular files under `dir`, sorted by path.
pub fn collect_all_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .sort(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_str().unwrap_or_default();
            !IGNORED_FILES.contains(&name)
        })
        .map(|e| e.path())
        .collect();
    files.sort();
    files
}

/// Collect content files based on CLI paths
pub fn collect_content_files(paths: &[PathBuf], content_dir: &Path) -> Result<Vec<PathBuf>> {
    // `-` reads the path list from stdin
    let paths: Vec<PathBuf> = if paths.len() == 1 && paths[0].as_os_str() == "-" {
        read_paths_from_stdin()?
    } else {
        paths.to_vec()
    };

    if paths.is_empty() {
        return Ok(filter_content_files(collect_all_files(content_dir)));
    }

    let mut all_files = Vec::new();
    for path in &paths {
        let resolved = resolve_path(path, content_dir);

        if resolved.is_file() {
            if ContentKind::is_content_file(&resolved) {
                all_files.push(resolved);
            } else {
                anyhow::bail!("Not a supported content file: {}", path.display());
            }
        } else if resolved.is_dir() {
            all_files.extend(filter_content_files(collect_all_files(&resolved)));
        } else {
            let content_relative = content_dir.join(path);
            anyhow::bail!(
                "Path not found: {}\n  Tried:\n    - {}\n    - {}",
                path.display(),
                path.display(),
                content_relative.display()
            );
        }
    }

    all_files.sort();
    all_files.dedup();
    Ok(all_files)
}

/// Read file paths from stdin, one per line
pub fn read_paths_from_stdin() -> Result<Vec<PathBuf>> {
    let stdin = io::stdin();
    let mut paths = Vec::new();

    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            paths.push(PathBuf::from(trimmed));
        }
    }

    Ok(paths)
}

/// Filter a list of paths to only include supported content files
pub fn filter_content_files(files: Vec<PathBuf>) -> Vec<PathBuf> {
    files
        .into_iter()
        .filter(|p| ContentKind::is_content_file(p))
        .collect()
}

/// Load the site config document, if one is configured or found.
pub fn load_site(config: &FolioConfig) -> Result<Option<SiteDocument>> {
    let Some(path) = config.site.resolve_config(&config.root) else {
        debug!("site"; "no site config found under {}", config.root.display());
        return Ok(None);
    };
    let site = SiteDocument::load(&path)
        .with_context(|| format!("failed to load site config `{}`", path.display()))?;
    debug!("site"; "loaded {}", path.display());
    Ok(Some(site))
}

/// A content file that could not be loaded.
#[derive(Debug)]
pub struct LoadFailure {
    /// Path under the content directory
    pub source: String,
    pub error: anyhow::Error,
}

/// Load content files in parallel. Results keep the order of `files`.
pub fn load_pages(
    files: &[PathBuf],
    content_dir: &Path,
    permalinks: &Permalinks,
) -> (Vec<Page>, Vec<LoadFailure>) {
    let results: Vec<_> = files
        .par_iter()
        .map(|file| {
            Page::load(file, content_dir, permalinks).map_err(|error| LoadFailure {
                source: relative_slash(file, content_dir),
                error,
            })
        })
        .collect();

    let mut pages = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(page) => pages.push(page),
            Err(failure) => failures.push(failure),
        }
    }
    (pages, failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn content_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let posts = dir.path().join("posts");
        fs::create_dir_all(&posts).unwrap();
        fs::write(posts.join("b.md"), "---\ntitle: B\n---\n").unwrap();
        fs::write(posts.join("a.html"), "---\ntitle: A\n---\n<p>a</p>").unwrap();
        fs::write(posts.join("cover.png"), [0u8]).unwrap();
        fs::write(dir.path().join("_index.md"), "+++\ntitle = 'Home'\n+++\n").unwrap();
        fs::write(dir.path().join(".DS_Store"), "").unwrap();
        dir
    }

    #[test]
    fn test_collect_all_content() {
        let dir = content_tree();
        let files = collect_content_files(&[], dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| relative_slash(f, dir.path()))
            .collect();
        assert_eq!(names, vec!["_index.md", "posts/a.html", "posts/b.md"]);
    }

    #[test]
    fn test_collect_subdirectory_and_file() {
        let dir = content_tree();
        let files = collect_content_files(&[PathBuf::from("posts")], dir.path()).unwrap();
        assert_eq!(files.len(), 2);

        let single = dir.path().join("posts/b.md");
        let files = collect_content_files(&[single.clone()], dir.path()).unwrap();
        assert_eq!(files, vec![single]);
    }

    #[test]
    fn test_collect_rejects_non_content() {
        let dir = content_tree();
        assert!(collect_content_files(&[dir.path().join("posts/cover.png")], dir.path()).is_err());
        assert!(collect_content_files(&[PathBuf::from("missing-dir")], dir.path()).is_err());
    }

    #[test]
    fn test_load_pages_keeps_order_and_failures() {
        let dir = content_tree();
        fs::write(dir.path().join("posts/broken.md"), "no front matter").unwrap();
        let files = collect_content_files(&[], dir.path()).unwrap();

        let (pages, failures) = load_pages(&files, dir.path(), &Permalinks::default());
        let urls: Vec<_> = pages.iter().map(|p| p.route.url.as_str()).collect();
        assert_eq!(urls, vec!["/", "/posts/a/", "/posts/b/"]);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].source, "posts/broken.md");
    }
}
