//! `[check]` section: what `folio check` enforces.
//!
//! ```toml
//! [check]
//! required = ["title", "date"]
//! drafts = true
//! links = "warn"        # error | warn | off
//! menu_order = "warn"   # error | warn | off
//! ```

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

/// How a class of findings is reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CheckLevel {
    Error,
    #[default]
    Warn,
    Off,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckSection {
    /// Front-matter fields every page must carry.
    pub required: Vec<String>,

    /// Check draft pages too.
    pub drafts: bool,

    /// Broken internal links in page bodies and menus.
    pub links: CheckLevel,

    /// Menu entries declared out of weight order.
    pub menu_order: CheckLevel,
}

impl Default for CheckSection {
    fn default() -> Self {
        Self {
            required: vec!["title".into(), "date".into()],
            drafts: true,
            links: CheckLevel::Warn,
            menu_order: CheckLevel::Warn,
        }
    }
}

impl CheckSection {
    pub const REQUIRED: FieldPath = FieldPath::new("check.required");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        for (i, field) in self.required.iter().enumerate() {
            if field.trim().is_empty() {
                diag.error(Self::REQUIRED, "required field names must not be empty");
            } else if self.required[..i].contains(field) {
                diag.warn(Self::REQUIRED, format!("`{field}` is listed twice"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.check.required, vec!["title", "date"]);
        assert!(config.check.drafts);
        assert_eq!(config.check.links, CheckLevel::Warn);
    }

    #[test]
    fn test_level_parsing() {
        for (input, expected) in [
            ("error", CheckLevel::Error),
            ("warn", CheckLevel::Warn),
            ("off", CheckLevel::Off),
        ] {
            let config = test_parse_config(&format!("[check]\nlinks = \"{input}\""));
            assert_eq!(config.check.links, expected, "links failed for {input}");
        }
    }

    #[test]
    fn test_empty_required_field_rejected() {
        let config = test_parse_config("[check]\nrequired = [\"title\", \" \"]");
        let mut diag = ConfigDiagnostics::new();
        config.check.validate(&mut diag);
        assert!(diag.has_errors());
    }
}
