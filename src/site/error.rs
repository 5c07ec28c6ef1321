//! Site config loading errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SiteError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("unsupported site config format `{0}` (expected .toml, .yaml, .yml or .json)")]
    UnsupportedFormat(PathBuf),

    #[error("site config is not valid TOML")]
    Toml(#[from] toml::de::Error),

    #[error("site config is not valid YAML")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("site config is not valid JSON")]
    Json(#[from] serde_json::Error),

    #[error("site config must be a table at the top level, found {0}")]
    NotATable(&'static str),
}
