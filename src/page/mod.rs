//! Content pages: front matter, metadata, URL and body links.

mod frontmatter;
mod links;
mod meta;
mod route;

pub use frontmatter::{FrontMatter, FrontMatterError, FrontMatterFormat};
pub use links::{BodyScan, Link, LinkOrigin};
pub use meta::{DATE_FIELDS, PageMeta};
pub use route::PageRoute;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::{ContentKind, Issue};
use crate::site::Permalinks;
use crate::utils::path::relative_slash;

/// A JSON object map for storing arbitrary metadata fields.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// A parsed content file.
#[derive(Debug, Clone)]
pub struct Page {
    pub source: PathBuf,
    /// Path under the content directory, `/`-separated
    pub relative: String,
    pub kind: ContentKind,
    pub format: FrontMatterFormat,
    pub meta: PageMeta,
    pub route: PageRoute,
    pub body: BodyScan,
    /// Field type and routing problems found while loading
    pub issues: Vec<Issue>,
}

impl Page {
    pub fn load(source: &Path, content_dir: &Path, permalinks: &Permalinks) -> Result<Self> {
        let kind = ContentKind::from_path(source)
            .with_context(|| format!("`{}` is not a content file", source.display()))?;
        let content = fs::read_to_string(source)
            .with_context(|| format!("failed to read `{}`", source.display()))?;
        let relative = relative_slash(source, content_dir);

        let mut page = Self::parse(&relative, &content, kind, permalinks)?;
        page.source = source.to_path_buf();
        Ok(page)
    }

    pub fn parse(
        relative: &str,
        content: &str,
        kind: ContentKind,
        permalinks: &Permalinks,
    ) -> Result<Self, FrontMatterError> {
        let front = FrontMatter::parse(content)?;
        let (meta, mut issues) = PageMeta::from_fields(front.fields);
        let (route, route_issues) = PageRoute::compute(Path::new(relative), &meta, permalinks);
        issues.extend(route_issues);

        Ok(Self {
            source: PathBuf::from(relative),
            relative: relative.to_owned(),
            kind,
            format: front.format,
            body: BodyScan::scan(front.body, kind),
            meta,
            route,
            issues,
        })
    }

    pub fn is_draft(&self) -> bool {
        self.meta.draft
    }

    /// Directory of the source file under the content root, `/`-separated.
    pub fn dir(&self) -> &str {
        self.relative.rsplit_once('/').map_or("", |(dir, _)| dir)
    }
}
