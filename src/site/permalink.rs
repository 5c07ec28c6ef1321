//! Permalink patterns (`[permalinks]`).
//!
//! ```toml
//! [permalinks]
//! posts = "/:year/:month/:slug/"
//!
//! [permalinks.page]          # kind-scoped form
//! notes = "/notes/:filename/"
//! ```
//!
//! Only page patterns matter for URL computation; section and taxonomy
//! patterns are accepted and token-checked.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::core::Issue;
use crate::utils::date::Date;
use crate::utils::path::clean_url;
use crate::utils::slug::urlize;
use crate::utils::value::type_name;

const TOKENS: &[&str] = &[
    "year",
    "month",
    "monthname",
    "day",
    "slug",
    "slugorfilename",
    "title",
    "filename",
    "section",
    "contentbasename",
];

const DATE_TOKENS: &[&str] = &["year", "month", "monthname", "day"];

const KINDS: &[&str] = &["page", "section", "taxonomy", "term"];

const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Values a page contributes to its permalink.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermalinkContext<'a> {
    pub date: Option<Date>,
    /// Front-matter `slug`, empty when unset
    pub slug: &'a str,
    pub title: &'a str,
    /// File stem, or the directory name for leaf bundles
    pub filename: &'a str,
    /// Top-level section
    pub section: &'a str,
    pub content_base_name: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Permalinks {
    /// section -> pattern, for pages
    page: BTreeMap<String, String>,
    /// `(kind, section)` -> pattern, for other kinds
    other: BTreeMap<(String, String), String>,
}

impl Permalinks {
    pub(crate) fn from_value(value: Option<&Value>, issues: &mut Vec<Issue>) -> Self {
        let mut permalinks = Self::default();
        let Some(value) = value else {
            return permalinks;
        };
        let Value::Object(map) = value else {
            issues.push(Issue::error(
                "permalinks",
                format!("expected a table, found {}", type_name(value)),
            ));
            return permalinks;
        };

        for (key, value) in map {
            match value {
                Value::String(pattern) => {
                    permalinks.page.insert(key.clone(), pattern.clone());
                }
                Value::Object(scoped) if KINDS.contains(&key.as_str()) => {
                    for (section, pattern) in scoped {
                        let target = format!("permalinks.{key}.{section}");
                        let Some(pattern) = pattern.as_str() else {
                            issues.push(Issue::error(
                                target,
                                format!("expected a string, found {}", type_name(pattern)),
                            ));
                            continue;
                        };
                        if key == "page" {
                            permalinks.page.insert(section.clone(), pattern.to_owned());
                        } else {
                            permalinks
                                .other
                                .insert((key.clone(), section.clone()), pattern.to_owned());
                        }
                    }
                }
                other => issues.push(Issue::error(
                    format!("permalinks.{key}"),
                    format!("expected a string, found {}", type_name(other)),
                )),
            }
        }
        permalinks
    }

    pub fn pattern_for(&self, section: &str) -> Option<&str> {
        self.page.get(section).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.page.is_empty() && self.other.is_empty()
    }

    /// Report unknown `:tokens` in every pattern.
    pub fn validate(&self) -> Vec<Issue> {
        let page = self
            .page
            .iter()
            .map(|(section, pattern)| (format!("permalinks.{section}"), pattern));
        let other = self
            .other
            .iter()
            .map(|((kind, section), pattern)| (format!("permalinks.{kind}.{section}"), pattern));

        page.chain(other)
            .flat_map(|(target, pattern)| {
                tokens(pattern)
                    .filter(|token| !TOKENS.contains(token))
                    .map(move |token| {
                        Issue::error(target.clone(), format!("unknown permalink token `:{token}`"))
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

/// Whether expanding `pattern` needs a page date.
pub fn needs_date(pattern: &str) -> bool {
    tokens(pattern).any(|token| DATE_TOKENS.contains(&token))
}

/// Expand `pattern` for a page. Returns `None` when a date token is used but
/// the page has no date. The result always starts and ends with `/`.
pub fn expand(pattern: &str, ctx: &PermalinkContext<'_>) -> Option<String> {
    let mut out = String::with_capacity(pattern.len() + 16);
    let mut rest = pattern;

    while let Some(pos) = rest.find(':') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let len = after
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(after.len());
        let token = &after[..len];

        match expand_token(token, ctx) {
            Ok(value) => out.push_str(&value),
            Err(Missing::Date) => return None,
            Err(Missing::Unknown) => {
                out.push(':');
                out.push_str(token);
            }
        }
        rest = &after[len..];
    }
    out.push_str(rest);

    Some(clean_url(&out))
}

enum Missing {
    Date,
    Unknown,
}

fn expand_token(token: &str, ctx: &PermalinkContext<'_>) -> Result<String, Missing> {
    let date = || ctx.date.ok_or(Missing::Date);
    let slug_or = |fallback: &str| {
        if ctx.slug.is_empty() {
            urlize(fallback)
        } else {
            urlize(ctx.slug)
        }
    };

    Ok(match token {
        "year" => format!("{:04}", date()?.year),
        "month" => format!("{:02}", date()?.month),
        "monthname" => MONTH_NAMES[usize::from(date()?.month - 1)].to_owned(),
        "day" => format!("{:02}", date()?.day),
        "slug" => slug_or(ctx.title),
        "slugorfilename" => slug_or(ctx.filename),
        "title" => urlize(ctx.title),
        "filename" => urlize(ctx.filename),
        "section" => ctx.section.to_owned(),
        "contentbasename" => urlize(ctx.content_base_name),
        _ => return Err(Missing::Unknown),
    })
}

fn tokens(pattern: &str) -> impl Iterator<Item = &str> {
    pattern.split(':').skip(1).map(|tail| {
        let len = tail
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(tail.len());
        &tail[..len]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> PermalinkContext<'static> {
        PermalinkContext {
            date: Some(Date::from_ymd(2023, 4, 9)),
            slug: "",
            title: "Momentum in the S&P 500",
            filename: "spx-momentum",
            section: "posts",
            content_base_name: "spx-momentum",
        }
    }

    #[test]
    fn test_expand_date_and_slug() {
        assert_eq!(
            expand("/:year/:month/:slug/", &ctx()).as_deref(),
            Some("/2023/04/momentum-in-the-s-p-500/")
        );
        assert_eq!(
            expand(":section/:day-:monthname/:filename", &ctx()).as_deref(),
            Some("/posts/09-april/spx-momentum/")
        );
    }

    #[test]
    fn test_expand_prefers_front_matter_slug() {
        let ctx = PermalinkContext {
            slug: "Momentum",
            ..ctx()
        };
        assert_eq!(expand("/:slug/", &ctx).as_deref(), Some("/momentum/"));
        assert_eq!(
            expand("/:slugorfilename/", &ctx).as_deref(),
            Some("/momentum/")
        );
    }

    #[test]
    fn test_expand_without_date() {
        let ctx = PermalinkContext {
            date: None,
            ..ctx()
        };
        assert_eq!(expand("/:year/:slug/", &ctx), None);
        assert!(needs_date("/:year/:slug/"));
        assert!(!needs_date("/:section/:slug/"));
    }

    #[test]
    fn test_from_value_both_forms() {
        let mut issues = Vec::new();
        let value = json!({
            "posts": "/:year/:slug/",
            "page": {"notes": "/n/:filename/"},
            "section": {"posts": "/blog/"},
            "about": 3
        });
        let permalinks = Permalinks::from_value(Some(&value), &mut issues);
        assert_eq!(permalinks.pattern_for("posts"), Some("/:year/:slug/"));
        assert_eq!(permalinks.pattern_for("notes"), Some("/n/:filename/"));
        assert_eq!(permalinks.pattern_for("blog"), None);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].target, "permalinks.about");
    }

    #[test]
    fn test_validate_unknown_token() {
        let value = json!({"posts": "/:year/:author/:slug/"});
        let permalinks = Permalinks::from_value(Some(&value), &mut Vec::new());
        let issues = permalinks.validate();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains(":author"));
    }
}
