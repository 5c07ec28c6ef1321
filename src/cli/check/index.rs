//! Everything a link inside the site can point to.

use std::path::Path;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::core::{ContentKind, LinkKind, split_path_fragment};
use crate::page::{Link, LinkOrigin, Page};
use crate::site::{Menu, Taxonomies};
use crate::utils::path::clean_url;
use crate::utils::slug::urlize;

/// Published URLs and content paths of the whole site.
pub struct SiteIndex<'a> {
    content_dir: &'a Path,
    static_dir: &'a Path,
    /// Page URL -> page
    pages: FxHashMap<&'a str, &'a Page>,
    /// Content path (`posts/hello.md`) -> page
    sources: FxHashMap<&'a str, &'a Page>,
    /// Aliases, section lists, taxonomy pages and feeds
    generated: FxHashSet<String>,
}

impl<'a> SiteIndex<'a> {
    pub fn build(
        pages: &'a [Page],
        taxonomies: &Taxonomies,
        content_dir: &'a Path,
        static_dir: &'a Path,
    ) -> Self {
        let mut index = Self {
            content_dir,
            static_dir,
            pages: FxHashMap::default(),
            sources: FxHashMap::default(),
            generated: FxHashSet::default(),
        };
        index.generated.insert("/".to_owned());

        for page in pages {
            index.pages.insert(&page.route.url, page);
            index.sources.insert(&page.relative, page);
            index.generated.extend(page.route.aliases.iter().cloned());
            index.insert_ancestors(&page.route.url);
        }

        for plural in taxonomies.plurals() {
            index.generated.insert(format!("/{plural}/"));
            for page in pages {
                for term in page.meta.terms(plural).unwrap_or_default() {
                    index.generated.insert(format!("/{plural}/{}/", urlize(&term)));
                }
            }
        }

        // Every list page has an RSS feed
        let feeds: Vec<String> = index
            .generated
            .iter()
            .map(|url| url.as_str())
            .chain(index.pages.keys().copied())
            .filter(|url| url.ends_with('/'))
            .map(|url| format!("{url}index.xml"))
            .collect();
        index.generated.extend(feeds);
        index.generated.insert("/sitemap.xml".to_owned());
        index
    }

    /// `/posts/2024/hello/` makes `/posts/2024/` and `/posts/` known.
    fn insert_ancestors(&mut self, url: &str) {
        let mut rest = url.trim_end_matches('/');
        while let Some((parent, _)) = rest.rsplit_once('/') {
            self.generated.insert(format!("{parent}/"));
            rest = parent;
        }
    }

    pub fn page(&self, url: &str) -> Option<&'a Page> {
        self.pages.get(url).copied()
    }

    /// Why `link` in `page` does not resolve, or `None` when it does.
    pub fn check_link(&self, page: &Page, link: &Link) -> Option<String> {
        let (path, fragment) = split_path_fragment(&link.target);

        if link.origin == LinkOrigin::Ref {
            if path.is_empty() {
                return missing_anchor(page, fragment);
            }
            return match self.resolve_ref(page.dir(), path) {
                Some(target) => missing_anchor(target, fragment),
                None => Some("content file not found".to_owned()),
            };
        }

        match LinkKind::parse(&link.target) {
            LinkKind::External(_) => None,
            LinkKind::Fragment(anchor) => missing_anchor(page, Some(anchor)),
            LinkKind::SiteRoot(_) => self.check_url(path, fragment),
            LinkKind::FileRelative(_) if path.is_empty() => missing_anchor(page, fragment),
            LinkKind::FileRelative(_) => {
                let source_relative = clean_url(&format!("{}/{path}", page.dir()));
                let source_relative = source_relative.trim_matches('/');
                if let Some(target) = self.source(source_relative) {
                    return missing_anchor(target, fragment);
                }
                if self.content_dir.join(source_relative).exists() {
                    return None;
                }
                self.check_url(&format!("{}{path}", page.route.url), fragment)
            }
        }
    }

    /// Why a menu entry destination does not resolve.
    pub fn check_menu(&self, menu: &Menu) -> Vec<(String, String)> {
        let mut broken = Vec::new();
        for entry in &menu.entries {
            let target = format!("menu.{}.{}", menu.name, entry.id());
            if let Some(page_ref) = &entry.page_ref {
                let (path, _) = split_path_fragment(page_ref);
                if self.resolve_ref("", path).is_none() {
                    broken.push((target, format!("pageRef `{page_ref}` not found")));
                }
            } else if let Some(url) = entry.url.as_deref().filter(|url| url.starts_with('/')) {
                let (path, fragment) = split_path_fragment(url);
                if let Some(reason) = self.check_url(path, fragment) {
                    broken.push((target, format!("url `{url}`: {reason}")));
                }
            }
        }
        broken
    }

    fn check_url(&self, path: &str, fragment: Option<&str>) -> Option<String> {
        let url = clean_url(path);
        if let Some(target) = self.page(&url) {
            return missing_anchor(target, fragment);
        }
        if self.generated.contains(&url) {
            return None;
        }
        let file = url.trim_start_matches('/');
        if self.static_dir.join(file).exists() || self.content_dir.join(file).exists() {
            return None;
        }
        Some("not found".to_owned())
    }

    /// Resolve a `ref`/`pageRef` target: a content path relative to `dir`,
    /// absolute from the content root, or a unique file name.
    pub fn resolve_ref(&self, dir: &str, target: &str) -> Option<&'a Page> {
        if let Some(absolute) = target.strip_prefix('/') {
            return self.source(clean_url(absolute).trim_matches('/'));
        }
        let relative = clean_url(&format!("{dir}/{target}"));
        if let Some(page) = self.source(relative.trim_matches('/')) {
            return Some(page);
        }
        if let Some(page) = self.source(clean_url(target).trim_matches('/')) {
            return Some(page);
        }

        let name = target.trim_end_matches('/');
        let mut matches = self
            .sources
            .iter()
            .filter(|(path, _)| path.rsplit('/').next() == Some(name));
        match (matches.next(), matches.next()) {
            (Some((_, page)), None) => Some(*page),
            _ => None,
        }
    }

    /// Content file at `path`, trying each content extension directly and
    /// on bundle index files.
    fn source(&self, path: &str) -> Option<&'a Page> {
        if path.is_empty() {
            return self.sources.get("_index.md").copied();
        }
        if let Some(page) = self.sources.get(path).copied() {
            return Some(page);
        }
        ["", "/index", "/_index"].iter().find_map(|stem| {
            ContentKind::EXTENSIONS.iter().find_map(|ext| {
                self.sources
                    .get(format!("{path}{stem}.{ext}").as_str())
                    .copied()
            })
        })
    }
}

fn missing_anchor(page: &Page, fragment: Option<&str>) -> Option<String> {
    match fragment {
        Some(anchor) if !anchor.is_empty() && !page.body.anchors.contains(anchor) => {
            Some(format!("anchor `#{anchor}` not found in {}", page.relative))
        }
        _ => None,
    }
}
