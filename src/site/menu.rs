//! Navigation menus (`[[menu.<name>]]` / `[[menus.<name>]]`).
//!
//! The generator sorts each menu by weight, so declaration order is only a
//! readability concern. Missing or duplicate weights make the rendered order
//! depend on names and are rejected.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::CheckLevel;
use crate::core::Issue;
use crate::utils::value::type_name;

/// One menu entry. Keys are matched after lowercasing, so `pageRef` and
/// `pageref` are the same field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuEntry {
    pub identifier: Option<String>,
    pub name: String,
    pub title: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "pageref")]
    pub page_ref: Option<String>,
    pub weight: Option<i64>,
    pub parent: Option<String>,
    pub pre: Option<String>,
    pub post: Option<String>,
}

impl MenuEntry {
    /// Key used for `parent` references and uniqueness.
    pub fn id(&self) -> &str {
        self.identifier.as_deref().unwrap_or(&self.name)
    }

    /// Destination, preferring `pageRef`.
    pub fn destination(&self) -> Option<&str> {
        self.page_ref.as_deref().or(self.url.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Menu {
    pub name: String,
    /// Entries in declaration order
    pub entries: Vec<MenuEntry>,
}

impl Menu {
    pub(super) fn from_value(name: &str, key: &str, value: &Value, issues: &mut Vec<Issue>) -> Self {
        let mut menu = Self {
            name: name.to_owned(),
            entries: Vec::new(),
        };
        let items = match value {
            Value::Array(items) => items.as_slice(),
            Value::Object(_) => std::slice::from_ref(value),
            other => {
                issues.push(Issue::error(
                    format!("{key}.{name}"),
                    format!("expected a list of entries, found {}", type_name(other)),
                ));
                return menu;
            }
        };

        for (i, item) in items.iter().enumerate() {
            match MenuEntry::deserialize(item) {
                Ok(entry) => menu.entries.push(entry),
                Err(err) => issues.push(Issue::error(format!("{key}.{name}[{i}]"), err.to_string())),
            }
        }
        menu
    }

    /// Entries sorted by weight, ties kept in declaration order.
    pub fn ordered(&self) -> Vec<&MenuEntry> {
        let mut entries: Vec<&MenuEntry> = self.entries.iter().collect();
        entries.sort_by_key(|entry| entry.weight.unwrap_or(0));
        entries
    }

    fn target(&self, index: usize) -> String {
        let entry = &self.entries[index];
        if entry.name.is_empty() {
            format!("menu.{}[{index}]", self.name)
        } else {
            format!("menu.{}[{index}] \"{}\"", self.name, entry.name)
        }
    }

    /// Structural checks. `order` controls how out-of-order declarations are
    /// reported.
    pub fn validate(&self, order: CheckLevel) -> Vec<Issue> {
        let mut issues = Vec::new();
        let mut weights: FxHashMap<i64, usize> = FxHashMap::default();
        let mut ids: FxHashMap<&str, usize> = FxHashMap::default();
        let mut last_weighted: Option<usize> = None;

        for (i, entry) in self.entries.iter().enumerate() {
            let target = self.target(i);

            if entry.name.trim().is_empty() {
                issues.push(Issue::error(&target, "entry has no `name`"));
            }
            if entry.destination().is_none_or(|d| d.trim().is_empty()) {
                issues.push(Issue::error(&target, "entry needs `url` or `pageRef`"));
            }

            if let Some(&first) = ids.get(entry.id()) {
                issues.push(Issue::error(
                    &target,
                    format!("identifier `{}` is already used by entry {first}", entry.id()),
                ));
            } else {
                ids.insert(entry.id(), i);
            }

            let Some(weight) = entry.weight else {
                issues.push(Issue::error(&target, "entry has no `weight`"));
                continue;
            };
            if let Some(&first) = weights.get(&weight) {
                issues.push(Issue::error(
                    &target,
                    format!(
                        "weight {weight} is already used by \"{}\"",
                        self.entries[first].name
                    ),
                ));
            } else {
                weights.insert(weight, i);
            }

            if let Some(prev) = last_weighted {
                let prev_entry = &self.entries[prev];
                let prev_weight = prev_entry.weight.unwrap_or_default();
                if weight < prev_weight {
                    let message = format!(
                        "weight {weight} is declared after \"{}\" (weight {prev_weight})",
                        prev_entry.name
                    );
                    match order {
                        CheckLevel::Error => issues.push(Issue::error(&target, message)),
                        CheckLevel::Warn => issues.push(Issue::warning(&target, message)),
                        CheckLevel::Off => {}
                    }
                }
            }
            if last_weighted.is_none_or(|prev| self.entries[prev].weight < Some(weight)) {
                last_weighted = Some(i);
            }
        }

        for (i, entry) in self.entries.iter().enumerate() {
            let Some(parent) = entry.parent.as_deref() else {
                continue;
            };
            if parent == entry.id() {
                issues.push(Issue::error(self.target(i), "entry is its own parent"));
            } else if !ids.contains_key(parent) {
                issues.push(Issue::error(
                    self.target(i),
                    format!("parent `{parent}` is not an entry of menu `{}`", self.name),
                ));
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Severity;
    use serde_json::json;

    fn menu(value: Value) -> Menu {
        let mut issues = Vec::new();
        let menu = Menu::from_value("main", "menu", &value, &mut issues);
        assert!(issues.is_empty(), "{issues:?}");
        menu
    }

    #[test]
    fn test_valid_menu() {
        let menu = menu(json!([
            {"name": "Posts", "url": "/posts/", "weight": 1},
            {"name": "About", "pageref": "/about", "weight": 2},
            {"name": "Archive", "url": "/archive/", "weight": 3, "parent": "Posts"}
        ]));
        assert!(menu.validate(CheckLevel::Error).is_empty());
    }

    #[test]
    fn test_duplicate_and_missing_weights() {
        let menu = menu(json!([
            {"name": "Posts", "url": "/posts/", "weight": 1},
            {"name": "About", "url": "/about/", "weight": 1},
            {"name": "Tags", "url": "/tags/"}
        ]));
        let issues = menu.validate(CheckLevel::Warn);
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(Issue::is_error));
        assert!(issues[0].message.contains("weight 1"));
        assert!(issues[1].message.contains("no `weight`"));
    }

    #[test]
    fn test_order_level() {
        let menu = menu(json!([
            {"name": "About", "url": "/about/", "weight": 20},
            {"name": "Posts", "url": "/posts/", "weight": 10},
            {"name": "Tags", "url": "/tags/", "weight": 15}
        ]));

        let warn = menu.validate(CheckLevel::Warn);
        assert_eq!(warn.len(), 2);
        assert!(warn.iter().all(|i| i.severity == Severity::Warning));
        assert_eq!(menu.validate(CheckLevel::Error).len(), 2);
        assert!(menu.validate(CheckLevel::Off).is_empty());

        let names: Vec<_> = menu.ordered().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Posts", "Tags", "About"]);
    }

    #[test]
    fn test_identifiers_and_parents() {
        let menu = menu(json!([
            {"identifier": "a", "name": "Posts", "url": "/posts/", "weight": 1},
            {"identifier": "a", "name": "Other", "url": "/other/", "weight": 2},
            {"name": "Child", "url": "/c/", "weight": 3, "parent": "missing"},
            {"name": "Loop", "url": "/l/", "weight": 4, "parent": "Loop"}
        ]));
        let issues = menu.validate(CheckLevel::Warn);
        let messages: Vec<_> = issues.iter().map(|i| i.message.as_str()).collect();
        assert_eq!(issues.len(), 3, "{messages:?}");
        assert!(messages[0].contains("identifier `a`"));
        assert!(messages[1].contains("parent `missing`"));
        assert!(messages[2].contains("its own parent"));
    }

    #[test]
    fn test_entry_shape_errors() {
        let mut issues = Vec::new();
        let menu = Menu::from_value(
            "main",
            "menu",
            &json!([{"name": "Posts", "weight": "first"}, {"weight": 2}]),
            &mut issues,
        );
        assert_eq!(issues.len(), 1);
        assert_eq!(menu.entries.len(), 1);

        let issues = menu.validate(CheckLevel::Warn);
        assert_eq!(issues.len(), 2);
        assert!(issues[0].message.contains("no `name`"));
        assert!(issues[1].message.contains("`url` or `pageRef`"));
    }
}
