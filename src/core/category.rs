//! Content file kinds.

use std::path::Path;

/// Kind of content file the generator renders into a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Markdown (.md, .markdown), including rendered notebooks
    Markdown,
    /// Raw HTML with front matter (.html, .htm)
    Html,
}

impl ContentKind {
    /// Every content file extension, preferred first.
    pub const EXTENSIONS: [&'static str; 4] = ["md", "markdown", "html", "htm"];

    /// Detect content kind from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "md" | "markdown" => Some(Self::Markdown),
            "html" | "htm" => Some(Self::Html),
            _ => None,
        }
    }

    /// Detect content kind from file path.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Display name for this content kind.
    pub fn name(self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Html => "html",
        }
    }

    /// Check if a path is a content file.
    #[inline]
    pub fn is_content_file(path: &Path) -> bool {
        Self::from_path(path).is_some()
    }
}
