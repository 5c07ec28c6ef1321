//! Taxonomy definitions (`[taxonomies]`, singular -> plural).

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::core::Issue;
use crate::utils::value::type_name;

/// Taxonomies applied when the site config declares none.
const DEFAULTS: [(&str, &str); 2] = [("category", "categories"), ("tag", "tags")];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Taxonomies {
    /// `(singular, plural)` in key order
    pairs: Vec<(String, String)>,
}

impl Default for Taxonomies {
    fn default() -> Self {
        Self {
            pairs: DEFAULTS
                .iter()
                .map(|(s, p)| ((*s).to_owned(), (*p).to_owned()))
                .collect(),
        }
    }
}

impl Taxonomies {
    /// An explicit empty table disables taxonomies; a missing key keeps the
    /// defaults.
    pub(super) fn from_value(value: Option<&Value>, issues: &mut Vec<Issue>) -> Self {
        let Some(value) = value else {
            return Self::default();
        };
        let Value::Object(map) = value else {
            issues.push(Issue::error(
                "taxonomies",
                format!("expected a table, found {}", type_name(value)),
            ));
            return Self::default();
        };

        let mut pairs = Vec::with_capacity(map.len());
        for (singular, plural) in map {
            match plural.as_str() {
                Some(plural) => pairs.push((singular.clone(), plural.to_owned())),
                None => issues.push(Issue::error(
                    format!("taxonomies.{singular}"),
                    format!("expected a string, found {}", type_name(plural)),
                )),
            }
        }
        Self { pairs }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(s, p)| (s.as_str(), p.as_str()))
    }

    /// Front-matter field names that carry terms.
    pub fn plurals(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(_, p)| p.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn validate(&self) -> Vec<Issue> {
        let mut issues = Vec::new();
        let mut seen: FxHashMap<&str, &str> = FxHashMap::default();

        for (singular, plural) in self.iter() {
            let target = format!("taxonomies.{singular}");
            if singular.trim().is_empty() {
                issues.push(Issue::error(target.clone(), "taxonomy name is empty"));
            }
            if plural.trim().is_empty() {
                issues.push(Issue::error(target, "plural name is empty"));
                continue;
            }
            if let Some(other) = seen.insert(plural, singular) {
                issues.push(Issue::error(
                    target,
                    format!("plural `{plural}` is already used by `{other}`"),
                ));
            }
        }
        issues
    }
}
