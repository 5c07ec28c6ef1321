//! Page URLs.
//!
//! ```text
//! content/_index.md               -> /
//! content/posts/_index.md         -> /posts/
//! content/posts/hello.md          -> /posts/hello/
//! content/posts/spx/index.md      -> /posts/spx/          (leaf bundle)
//! content/posts/hello.md + slug   -> /posts/<slug>/
//! front matter `url`              -> used as-is
//! [permalinks] posts = "/:year/:slug/"
//! content/posts/hello.md          -> /2023/hello/
//! ```

use std::path::{Component, Path};

use super::PageMeta;
use crate::core::Issue;
use crate::site::{PermalinkContext, Permalinks, permalink};
use crate::utils::path::clean_url;
use crate::utils::slug::path_segment;

/// Where a content file is published.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRoute {
    /// URL path, always starting with `/`
    pub url: String,
    /// Top-level content directory, empty for root pages
    pub section: String,
    /// Section list page (`_index.md`)
    pub is_section: bool,
    /// Alias URLs, normalized like `url`
    pub aliases: Vec<String>,
}

impl PageRoute {
    /// Compute the route of `relative` (path under the content directory).
    pub fn compute(relative: &Path, meta: &PageMeta, permalinks: &Permalinks) -> (Self, Vec<Issue>) {
        let mut issues = Vec::new();
        let parts: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        let (dirs, _) = parts.split_at(parts.len().saturating_sub(1));
        let stem = relative
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let is_section = stem == "_index";
        let is_bundle = stem == "index";
        let section = dirs.first().cloned().unwrap_or_default();

        // Leaf bundles take their name from the directory
        let (parent_dirs, filename) = match (is_bundle, dirs.split_last()) {
            (true, Some((last, rest))) => (rest, last.clone()),
            _ => (dirs, stem),
        };

        let url = if let Some(url) = meta.url.as_deref().filter(|u| !u.trim().is_empty()) {
            clean_url(url)
        } else if is_section || (is_bundle && dirs.is_empty()) {
            join_segments(dirs, None)
        } else {
            let title = meta.title.as_deref().unwrap_or_default();
            let slug = meta.slug.as_deref().unwrap_or_default();
            let pattern = (!section.is_empty())
                .then(|| permalinks.pattern_for(&section))
                .flatten();

            let expanded = pattern.and_then(|pattern| {
                let ctx = PermalinkContext {
                    date: meta.published(),
                    slug,
                    title,
                    filename: &filename,
                    section: &section,
                    content_base_name: &filename,
                };
                let url = permalink::expand(pattern, &ctx);
                if url.is_none() {
                    issues.push(Issue::warning(
                        format!("permalinks.{section}"),
                        format!("`{pattern}` needs a date but the page has none, using the default URL"),
                    ));
                }
                url
            });

            expanded.unwrap_or_else(|| {
                let name = if slug.trim().is_empty() { filename.as_str() } else { slug };
                join_segments(parent_dirs, Some(name))
            })
        };

        let aliases = meta
            .aliases
            .iter()
            .map(|alias| {
                if alias.starts_with('/') {
                    clean_url(alias)
                } else {
                    clean_url(&format!("{url}../{alias}"))
                }
            })
            .collect();

        let route = Self {
            url,
            section,
            is_section,
            aliases,
        };
        (route, issues)
    }
}

fn join_segments(dirs: &[String], name: Option<&str>) -> String {
    let mut path = String::from("/");
    for segment in dirs.iter().map(String::as_str).chain(name) {
        path.push_str(&path_segment(segment));
        path.push('/');
    }
    clean_url(&path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn route(relative: &str, meta: serde_json::Value, permalinks: &Permalinks) -> (PageRoute, Vec<Issue>) {
        let serde_json::Value::Object(fields) = meta else {
            unreachable!()
        };
        let (meta, _) = PageMeta::from_fields(fields);
        PageRoute::compute(Path::new(relative), &meta, permalinks)
    }

    fn url(relative: &str, meta: serde_json::Value) -> String {
        route(relative, meta, &Permalinks::default()).0.url
    }

    #[test]
    fn test_default_urls() {
        assert_eq!(url("_index.md", json!({})), "/");
        assert_eq!(url("posts/_index.md", json!({})), "/posts/");
        assert_eq!(url("posts/hello.md", json!({})), "/posts/hello/");
        assert_eq!(url("posts/spx/index.md", json!({})), "/posts/spx/");
        assert_eq!(url("about.md", json!({})), "/about/");
        assert_eq!(url("Posts/My Post.md", json!({})), "/posts/my-post/");
    }

    #[test]
    fn test_slug_and_url_overrides() {
        assert_eq!(url("posts/hello.md", json!({"slug": "hi"})), "/posts/hi/");
        assert_eq!(url("posts/hello.md", json!({"url": "custom/path"})), "/custom/path/");
        assert_eq!(url("posts/spx/index.md", json!({"slug": "momentum"})), "/posts/momentum/");
    }

    #[test]
    fn test_permalink_pattern() {
        let mut issues = Vec::new();
        let permalinks = Permalinks::from_value(
            Some(&json!({"posts": "/:year/:month/:slug/"})),
            &mut issues,
        );

        let (route, issues) = route(
            "posts/hello.md",
            json!({"title": "Hello World", "date": "2023-04-09"}),
            &permalinks,
        );
        assert!(issues.is_empty());
        assert_eq!(route.url, "/2023/04/hello-world/");
        assert_eq!(route.section, "posts");

        // Section pages and other sections keep the default
        assert_eq!(route_url("posts/_index.md", &permalinks), "/posts/");
        assert_eq!(route_url("notes/a.md", &permalinks), "/notes/a/");
    }

    fn route_url(relative: &str, permalinks: &Permalinks) -> String {
        route(relative, json!({"date": "2023-01-01"}), permalinks).0.url
    }

    #[test]
    fn test_permalink_without_date_falls_back() {
        let permalinks =
            Permalinks::from_value(Some(&json!({"posts": "/:year/:slug/"})), &mut Vec::new());
        let (route, issues) = route("posts/hello.md", json!({"title": "Hi"}), &permalinks);
        assert_eq!(route.url, "/posts/hello/");
        assert_eq!(issues.len(), 1);
        assert!(!issues[0].is_error());
    }

    #[test]
    fn test_aliases() {
        let (route, _) = route(
            "posts/hello.md",
            json!({"aliases": ["/old/hello", "legacy"]}),
            &Permalinks::default(),
        );
        assert_eq!(route.aliases, ["/old/hello/", "/posts/legacy/"]);
    }
}
