//! `[site]` section: where the generator's inputs live.
//!
//! ```toml
//! [site]
//! config = "hugo.toml"   # auto-detected when omitted
//! content = "content"
//! static = "static"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::{ConfigDiagnostics, FieldPath};

/// Site config file names probed in order when `site.config` is unset.
pub const SITE_CONFIG_CANDIDATES: [&str; 5] = [
    "hugo.toml",
    "config.toml",
    "config.yaml",
    "config.yml",
    "config.json",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSection {
    /// Site configuration document read by the generator.
    pub config: Option<PathBuf>,

    /// Content directory.
    pub content: PathBuf,

    /// Static files directory, copied verbatim by the generator.
    #[serde(rename = "static")]
    pub static_dir: PathBuf,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            config: None,
            content: "content".into(),
            static_dir: "static".into(),
        }
    }
}

impl SiteSection {
    pub const CONFIG: FieldPath = FieldPath::new("site.config");
    pub const CONTENT: FieldPath = FieldPath::new("site.content");

    /// Resolve the site config path: explicit setting first, then the first
    /// candidate that exists under `root`.
    pub fn resolve_config(&self, root: &Path) -> Option<PathBuf> {
        if let Some(path) = &self.config {
            return Some(root.join(path));
        }
        SITE_CONFIG_CANDIDATES
            .iter()
            .map(|name| root.join(name))
            .find(|path| path.is_file())
    }

    /// Make relative paths absolute against `root`.
    pub fn normalize(&mut self, root: &Path) {
        self.content = root.join(&self.content);
        self.static_dir = root.join(&self.static_dir);
        if let Some(config) = self.config.take() {
            self.config = Some(root.join(config));
        }
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if let Some(config) = &self.config
            && !config.is_file()
        {
            diag.error(
                Self::CONFIG,
                format!("site config `{}` does not exist", config.display()),
            );
        }
        if !self.content.is_dir() {
            diag.warn(
                Self::CONTENT,
                format!("content directory `{}` not found", self.content.display()),
            );
        }
    }
}
