//! The generator's site configuration document.
//!
//! The document is read as TOML, YAML or JSON depending on its extension,
//! normalized to a JSON tree with lowercased keys (the generator treats keys
//! case-insensitively), and then split into typed parts:
//!
//! | Key                   | Type                    |
//! |-----------------------|-------------------------|
//! | `menu` / `menus`      | [`Menu`] per name       |
//! | `taxonomies`          | [`Taxonomies`]          |
//! | `permalinks`          | [`Permalinks`]          |
//!
//! Everything else stays in the raw tree and is checked by [`SiteDocument::validate`].
//! Type problems found while splitting are kept and reported with the rest.

mod error;
mod menu;
pub mod permalink;
mod taxonomy;

pub use error::SiteError;
pub use menu::{Menu, MenuEntry};
pub use permalink::{PermalinkContext, Permalinks};
pub use taxonomy::Taxonomies;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::config::CheckLevel;
use crate::core::Issue;
use crate::utils::value::{lowercase_keys, toml_to_json, type_name};

/// Top-level keys the generator understands, lowercased. Keys outside this
/// list are kept but only mentioned in verbose output.
const KNOWN_KEYS: &[&str] = &[
    "author",
    "baseurl",
    "build",
    "builddrafts",
    "buildexpired",
    "buildfuture",
    "canonifyurls",
    "caches",
    "cascade",
    "contentdir",
    "copyright",
    "defaultcontentlanguage",
    "disablekinds",
    "disqusshortname",
    "enableemoji",
    "enablegitinfo",
    "enableinlineshortcodes",
    "enablerobotstxt",
    "frontmatter",
    "googleanalytics",
    "hascjklanguage",
    "imaging",
    "languagecode",
    "languages",
    "markup",
    "mediatypes",
    "menu",
    "menus",
    "minify",
    "module",
    "outputformats",
    "outputs",
    "paginate",
    "pagination",
    "params",
    "permalinks",
    "privacy",
    "publishdir",
    "pygmentscodefences",
    "pygmentsstyle",
    "related",
    "relativeurls",
    "removepathaccents",
    "security",
    "services",
    "sitemap",
    "staticdir",
    "summarylength",
    "taxonomies",
    "theme",
    "themesdir",
    "timezone",
    "title",
    "titlecasestyle",
    "uglyurls",
];

/// Keys whose value must be a table when present.
const TABLE_KEYS: &[&str] = &["markup", "services", "params", "outputs", "sitemap"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteFormat {
    Toml,
    Yaml,
    Json,
}

impl SiteFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Options for [`SiteDocument::validate`].
#[derive(Debug, Clone, Copy)]
pub struct SiteCheck<'a> {
    /// Project root, used to locate `themes/`
    pub root: &'a Path,
    pub menu_order: CheckLevel,
}

#[derive(Debug, Clone)]
pub struct SiteDocument {
    /// Source file, empty when parsed from a string
    pub path: PathBuf,
    pub format: SiteFormat,
    /// Menus sorted by name
    pub menus: Vec<Menu>,
    pub taxonomies: Taxonomies,
    pub permalinks: Permalinks,
    values: Map<String, Value>,
    shape_issues: Vec<Issue>,
}

impl SiteDocument {
    pub fn load(path: &Path) -> Result<Self, SiteError> {
        let format = SiteFormat::from_path(path)
            .ok_or_else(|| SiteError::UnsupportedFormat(path.to_path_buf()))?;
        let content =
            fs::read_to_string(path).map_err(|err| SiteError::Io(path.to_path_buf(), err))?;
        let mut doc = Self::parse(&content, format)?;
        doc.path = path.to_path_buf();
        Ok(doc)
    }

    pub fn parse(content: &str, format: SiteFormat) -> Result<Self, SiteError> {
        let value = match format {
            SiteFormat::Toml => toml_to_json(toml::from_str::<toml::Value>(content)?),
            SiteFormat::Yaml if content.trim().is_empty() => Value::Object(Map::new()),
            SiteFormat::Yaml => serde_yaml_ng::from_str::<Value>(content)?,
            SiteFormat::Json => serde_json::from_str::<Value>(content)?,
        };
        let values = match lowercase_keys(value) {
            Value::Object(values) => values,
            other => return Err(SiteError::NotATable(type_name(&other))),
        };

        let mut shape_issues = Vec::new();
        let menus = collect_menus(&values, &mut shape_issues);
        let taxonomies = Taxonomies::from_value(values.get("taxonomies"), &mut shape_issues);
        let permalinks = Permalinks::from_value(values.get("permalinks"), &mut shape_issues);

        Ok(Self {
            path: PathBuf::new(),
            format,
            menus,
            taxonomies,
            permalinks,
            values,
            shape_issues,
        })
    }

    /// Raw value by lowercased key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(&key.to_lowercase())
    }

    pub fn base_url(&self) -> Option<&str> {
        self.get("baseurl").and_then(Value::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.get("title").and_then(Value::as_str)
    }

    pub fn language_code(&self) -> Option<&str> {
        self.get("languagecode").and_then(Value::as_str)
    }

    /// Theme names, accepting a single string or a list.
    pub fn themes(&self) -> Vec<&str> {
        match self.get("theme") {
            Some(Value::String(theme)) => vec![theme.as_str()],
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn menu(&self, name: &str) -> Option<&Menu> {
        self.menus.iter().find(|menu| menu.name == name)
    }

    /// Top-level keys the generator does not know about.
    pub fn unknown_keys(&self) -> Vec<&str> {
        self.values
            .keys()
            .map(String::as_str)
            .filter(|key| !KNOWN_KEYS.contains(key))
            .collect()
    }

    /// Check the document against the generator's schema. Link targets of
    /// menu entries are resolved separately, against the content tree.
    pub fn validate(&self, check: &SiteCheck<'_>) -> Vec<Issue> {
        let mut issues = self.shape_issues.clone();

        self.check_base_url(&mut issues);
        self.check_strings(&mut issues);
        self.check_themes(check.root, &mut issues);
        self.check_tables(&mut issues);
        if let Some(privacy) = self.get("privacy") {
            check_privacy(privacy, &mut issues);
        }

        for menu in &self.menus {
            issues.extend(menu.validate(check.menu_order));
        }
        issues.extend(self.taxonomies.validate());
        issues.extend(self.permalinks.validate());
        issues
    }

    fn check_base_url(&self, issues: &mut Vec<Issue>) {
        const KEY: &str = "baseURL";
        let Some(value) = self.get("baseurl") else {
            issues.push(Issue::warning(KEY, "not set, generated links will be host-relative"));
            return;
        };
        let Some(raw) = value.as_str() else {
            issues.push(Issue::error(
                KEY,
                format!("expected a string, found {}", type_name(value)),
            ));
            return;
        };

        match url::Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {
                if !raw.ends_with('/') {
                    issues.push(Issue::warning(KEY, format!("`{raw}` should end with `/`")));
                }
            }
            Ok(url) => issues.push(Issue::error(
                KEY,
                format!("`{raw}` must be an http(s) URL, found scheme `{}`", url.scheme()),
            )),
            Err(err) => issues.push(Issue::error(KEY, format!("`{raw}` is not a URL: {err}"))),
        }
    }

    fn check_strings(&self, issues: &mut Vec<Issue>) {
        match self.get("title") {
            None => issues.push(Issue::error("title", "site title is missing")),
            Some(Value::String(title)) if title.trim().is_empty() => {
                issues.push(Issue::error("title", "site title is empty"));
            }
            Some(Value::String(_)) => {}
            Some(other) => issues.push(Issue::error(
                "title",
                format!("expected a string, found {}", type_name(other)),
            )),
        }

        for (key, display) in [("languagecode", "languageCode"), ("copyright", "copyright")] {
            if let Some(value) = self.get(key)
                && !value.is_string()
            {
                issues.push(Issue::error(
                    display,
                    format!("expected a string, found {}", type_name(value)),
                ));
            }
        }

        if let Some(author) = self.get("author")
            && !matches!(author, Value::String(_) | Value::Object(_))
        {
            issues.push(Issue::error(
                "author",
                format!("expected a string or table, found {}", type_name(author)),
            ));
        }
    }

    fn check_themes(&self, root: &Path, issues: &mut Vec<Issue>) {
        let Some(value) = self.get("theme") else {
            return;
        };
        let valid_shape = match value {
            Value::String(_) => true,
            Value::Array(items) => items.iter().all(Value::is_string),
            _ => false,
        };
        if !valid_shape {
            issues.push(Issue::error(
                "theme",
                "expected a theme name or a list of theme names",
            ));
            return;
        }

        let themes_dir = root.join(
            self.get("themesdir")
                .and_then(Value::as_str)
                .unwrap_or("themes"),
        );
        for theme in self.themes() {
            if theme.trim().is_empty() {
                issues.push(Issue::error("theme", "theme name is empty"));
            } else if !themes_dir.join(theme).is_dir() {
                issues.push(Issue::warning(
                    "theme",
                    format!(
                        "theme `{theme}` not found in `{}` (module themes are not checked)",
                        themes_dir.display()
                    ),
                ));
            }
        }
    }

    fn check_tables(&self, issues: &mut Vec<Issue>) {
        for key in TABLE_KEYS {
            if let Some(value) = self.get(key)
                && !value.is_object()
            {
                issues.push(Issue::error(
                    *key,
                    format!("expected a table, found {}", type_name(value)),
                ));
            }
        }
    }
}

/// `privacy.<service>.<flag>` leaves must all be booleans.
fn check_privacy(value: &Value, issues: &mut Vec<Issue>) {
    let Value::Object(services) = value else {
        issues.push(Issue::error(
            "privacy",
            format!("expected a table, found {}", type_name(value)),
        ));
        return;
    };

    for (service, flags) in services {
        let target = format!("privacy.{service}");
        let Value::Object(flags) = flags else {
            issues.push(Issue::error(
                target,
                format!("expected a table of flags, found {}", type_name(flags)),
            ));
            continue;
        };
        for (flag, value) in flags {
            if !value.is_boolean() {
                issues.push(Issue::error(
                    format!("{target}.{flag}"),
                    format!("expected a boolean, found {}", type_name(value)),
                ));
            }
        }
    }
}

/// Gather `menu` and `menus` into one list sorted by menu name.
fn collect_menus(values: &Map<String, Value>, issues: &mut Vec<Issue>) -> Vec<Menu> {
    let mut menus: BTreeMap<String, Menu> = BTreeMap::new();
    let mut seen_keys = 0;

    for key in ["menus", "menu"] {
        let Some(value) = values.get(key) else {
            continue;
        };
        seen_keys += 1;
        let Value::Object(map) = value else {
            issues.push(Issue::error(
                key,
                format!("expected a table of menus, found {}", type_name(value)),
            ));
            continue;
        };
        for (name, entries) in map {
            let menu = Menu::from_value(name, key, entries, issues);
            match menus.get_mut(name) {
                Some(existing) => existing.entries.extend(menu.entries),
                None => {
                    menus.insert(name.clone(), menu);
                }
            }
        }
    }

    if seen_keys > 1 {
        issues.push(Issue::warning(
            "menus",
            "both `menu` and `menus` are set, entries are merged",
        ));
    }
    menus.into_values().collect()
}
