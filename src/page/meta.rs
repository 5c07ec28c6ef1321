//! Page metadata from front matter.

use serde::Serialize;
use serde_json::Value;

use super::JsonMap;
use crate::core::Issue;
use crate::utils::date::{Date, DateTime};
use crate::utils::value::{is_blank, type_name};

/// Fields holding timestamps.
pub const DATE_FIELDS: [&str; 4] = ["date", "lastmod", "publishdate", "expirydate"];

/// Page metadata
///
/// # Standard Fields
///
/// | Field         | Type          | Description                          |
/// |---------------|---------------|--------------------------------------|
/// | `title`       | `String`      | Page title                           |
/// | `date`        | `String`      | Publication date                     |
/// | `lastmod`     | `String`      | Last modification date               |
/// | `publishDate` | `String`      | Hidden before this date              |
/// | `expiryDate`  | `String`      | Hidden after this date               |
/// | `description` | `String`      | Meta description                     |
/// | `summary`     | `String`      | Listing summary                      |
/// | `excerpt`     | `String`      | Theme-specific teaser                |
/// | `draft`       | `bool`        | Draft status (default: false)        |
/// | `slug`        | `String`      | Last URL segment                     |
/// | `url`         | `String`      | Full URL path, overrides everything  |
/// | `aliases`     | `Vec<String>` | Redirect URLs to this page           |
/// | `weight`      | `i64`         | Ordering within lists                |
/// | `tags`        | `Vec<String>` | Tag terms                            |
/// | `categories`  | `Vec<String>` | Category terms                       |
///
/// Everything else lands in `extra`, keys lowercased.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub title: Option<String>,
    pub date: Option<String>,
    pub lastmod: Option<String>,
    pub publish_date: Option<String>,
    pub expiry_date: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub excerpt: Option<String>,
    pub draft: bool,
    pub slug: Option<String>,
    pub url: Option<String>,
    pub aliases: Vec<String>,
    pub weight: Option<i64>,
    pub tags: Vec<String>,
    pub categories: Vec<String>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

impl PageMeta {
    /// Split raw front matter into typed fields. Fields with the wrong type
    /// are dropped and reported.
    pub fn from_fields(mut fields: JsonMap) -> (Self, Vec<Issue>) {
        let mut issues = Vec::new();
        let mut take_string = |fields: &mut JsonMap, key: &str| -> Option<String> {
            match fields.remove(key)? {
                Value::Null => None,
                Value::String(s) => Some(s),
                // Bare numbers are common in titles and slugs
                Value::Number(n) if !DATE_FIELDS.contains(&key) => Some(n.to_string()),
                other => {
                    issues.push(type_issue(key, "a string", &other));
                    None
                }
            }
        };

        let title = take_string(&mut fields, "title");
        let date = take_string(&mut fields, "date");
        let lastmod = take_string(&mut fields, "lastmod");
        let publish_date = take_string(&mut fields, "publishdate");
        let expiry_date = take_string(&mut fields, "expirydate");
        let description = take_string(&mut fields, "description");
        let summary = take_string(&mut fields, "summary");
        let excerpt = take_string(&mut fields, "excerpt");
        let slug = take_string(&mut fields, "slug");
        let url = take_string(&mut fields, "url");

        let draft = match fields.remove("draft") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => b,
            Some(other) => {
                issues.push(type_issue("draft", "a boolean", &other));
                false
            }
        };

        let weight = match fields.remove("weight") {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) if n.is_i64() => n.as_i64(),
            Some(other) => {
                issues.push(type_issue("weight", "an integer", &other));
                None
            }
        };

        let mut take_list = |key: &str| match fields.remove(key) {
            None => Vec::new(),
            Some(value) => string_list(&value).unwrap_or_else(|| {
                issues.push(type_issue(key, "a string or a list of strings", &value));
                Vec::new()
            }),
        };
        let aliases = take_list("aliases");
        let tags = take_list("tags");
        let categories = take_list("categories");

        let meta = Self {
            title,
            date,
            lastmod,
            publish_date,
            expiry_date,
            description,
            summary,
            excerpt,
            draft,
            slug,
            url,
            aliases,
            weight,
            tags,
            categories,
            extra: fields,
        };
        (meta, issues)
    }

    /// Raw text of a date field by lowercased name.
    pub fn date_field(&self, name: &str) -> Option<&str> {
        match name {
            "date" => self.date.as_deref(),
            "lastmod" => self.lastmod.as_deref(),
            "publishdate" => self.publish_date.as_deref(),
            "expirydate" => self.expiry_date.as_deref(),
            _ => None,
        }
    }

    /// Publication date, if `date` parses.
    pub fn published(&self) -> Option<Date> {
        self.date
            .as_deref()
            .and_then(DateTime::parse)
            .map(|dt| dt.date)
    }

    /// Whether a field is present and non-blank. `draft` always counts as
    /// present since it has a default.
    pub fn has_field(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        let text = |field: &Option<String>| field.as_deref().is_some_and(|s| !s.trim().is_empty());
        match name.as_str() {
            "title" => text(&self.title),
            "date" => text(&self.date),
            "lastmod" => text(&self.lastmod),
            "publishdate" => text(&self.publish_date),
            "expirydate" => text(&self.expiry_date),
            "description" => text(&self.description),
            "summary" => text(&self.summary),
            "excerpt" => text(&self.excerpt),
            "slug" => text(&self.slug),
            "url" => text(&self.url),
            "draft" => true,
            "weight" => self.weight.is_some(),
            "aliases" => !self.aliases.is_empty(),
            "tags" => !self.tags.is_empty(),
            "categories" => !self.categories.is_empty(),
            other => self.extra.get(other).is_some_and(|v| !is_blank(v)),
        }
    }

    /// Terms for a taxonomy plural. `Err` carries the offending value's type.
    pub fn terms(&self, plural: &str) -> Result<Vec<String>, &'static str> {
        match plural {
            "tags" => Ok(self.tags.clone()),
            "categories" => Ok(self.categories.clone()),
            other => match self.extra.get(other) {
                None => Ok(Vec::new()),
                Some(value) => string_list(value).ok_or(type_name(value)),
            },
        }
    }

    /// Checks on values: date syntax, `lastmod` ordering and taxonomy shapes.
    pub fn validate(&self, plurals: &[&str]) -> Vec<Issue> {
        let mut issues = Vec::new();

        let mut parsed = [None; DATE_FIELDS.len()];
        for (slot, field) in parsed.iter_mut().zip(DATE_FIELDS) {
            let Some(raw) = self.date_field(field) else {
                continue;
            };
            match DateTime::parse(raw) {
                Some(dt) => *slot = Some(dt),
                None => issues.push(Issue::error(
                    field,
                    format!("`{raw}` is not a date (expected YYYY-MM-DD, YYYY-MM-DD HH:MM:SS or RFC 3339)"),
                )),
            }
        }

        if let [Some(date), Some(lastmod), ..] = parsed
            && lastmod.timestamp() < date.timestamp()
        {
            issues.push(Issue::warning(
                "lastmod",
                format!(
                    "{} is earlier than date {}",
                    lastmod.to_rfc3339(),
                    date.to_rfc3339()
                ),
            ));
        }
        if let [_, _, Some(publish), Some(expiry)] = parsed
            && expiry.timestamp() <= publish.timestamp()
        {
            issues.push(Issue::warning(
                "expiryDate",
                "expires before it is published, the page will never be built",
            ));
        }

        for plural in plurals {
            if matches!(*plural, "tags" | "categories") {
                continue;
            }
            if let Err(found) = self.terms(plural) {
                issues.push(Issue::error(
                    *plural,
                    format!("expected a string or a list of strings, found {found}"),
                ));
            }
        }

        issues
    }
}

fn type_issue(key: &str, expected: &str, found: &Value) -> Issue {
    Issue::error(key, format!("expected {expected}, found {}", type_name(found)))
}

/// A single string or a list of strings. `null` is an empty list.
fn string_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Null => Some(Vec::new()),
        Value::String(s) => Some(vec![s.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_owned))
            .collect(),
        _ => None,
    }
}
