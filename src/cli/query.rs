//! Query command implementation.
//!
//! Loads content files in parallel and prints their metadata as JSON, one
//! object per page with `path` and `url` first.

use std::fs;
use std::io::Write;

use anyhow::{Context, Result};
use serde_json::{Map, Value as JsonValue};

use super::common::{collect_content_files, load_pages, load_site};
use crate::cli::QueryArgs;
use crate::config::FolioConfig;
use crate::page::Page;
use crate::site::Permalinks;
use crate::utils::path::relative_slash;
use crate::utils::plural_count;
use crate::utils::value::is_blank;
use crate::{debug, log};

/// Execute query command
pub fn run_query(args: &QueryArgs, config: &FolioConfig) -> Result<()> {
    let permalinks = match load_site(config) {
        Ok(Some(site)) => site.permalinks,
        Ok(None) => Permalinks::default(),
        Err(err) => {
            log!("warning"; "{:#}, using default permalinks", err);
            Permalinks::default()
        }
    };

    let content_dir = &config.site.content;
    let files = collect_content_files(&args.paths, content_dir)?;
    log!("query"; "querying {}", plural_count(files.len(), "file"));

    let (pages, failures) = load_pages(&files, content_dir, &permalinks);
    for failure in &failures {
        log!("warning"; "skipping {}: {:#}", failure.source, failure.error);
    }

    let pages: Vec<&Page> = pages
        .iter()
        .filter(|page| {
            let keep = args.drafts || !page.is_draft();
            if !keep {
                debug!("query"; "skipping draft {}", page.relative);
            }
            keep
        })
        .collect();
    log!("query"; "found {}", plural_count(pages.len(), "page"));

    if pages.is_empty() {
        return Ok(());
    }

    let objects: Vec<JsonValue> = pages
        .iter()
        .map(|page| {
            let path = relative_slash(&page.source, &config.root);
            format_page(page, path, args.fields.as_deref(), args.filter_empty)
        })
        .collect::<Result<_>>()?;
    let output = JsonValue::Array(objects);

    let formatted = if args.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };

    if let Some(ref output_path) = args.output {
        let mut file = fs::File::create(output_path)
            .with_context(|| format!("failed to create `{}`", output_path.display()))?;
        writeln!(file, "{}", formatted)?;
        log!("query"; "wrote output to {}", output_path.display());
    } else {
        println!("{}", formatted);
    }

    Ok(())
}

/// One page as a JSON object. Requested fields that are missing show up as
/// `null` unless empty values are filtered.
fn format_page(
    page: &Page,
    path: String,
    fields: Option<&[String]>,
    filter_empty: bool,
) -> Result<JsonValue> {
    let mut all = Map::new();
    all.insert("url".to_owned(), JsonValue::String(page.route.url.clone()));
    all.insert("kind".to_owned(), serde_json::to_value(page.kind)?);
    all.insert("format".to_owned(), serde_json::to_value(page.format)?);
    all.insert(
        "section".to_owned(),
        JsonValue::String(page.route.section.clone()),
    );
    // Computed fields win; a front-matter `url` is already part of the route
    if let JsonValue::Object(meta) = serde_json::to_value(&page.meta)? {
        for (key, value) in meta {
            all.entry(key).or_insert(value);
        }
    }

    // path and url always first
    let mut obj = Map::new();
    obj.insert("path".to_owned(), JsonValue::String(path));
    if let Some(url) = all.shift_remove("url") {
        obj.insert("url".to_owned(), url);
    }

    match fields {
        Some(fields) => {
            for field in fields {
                match all.get(field) {
                    Some(value) if !filter_empty || !is_blank(value) => {
                        obj.insert(field.clone(), value.clone());
                    }
                    Some(_) => {}
                    None if !filter_empty => {
                        obj.insert(field.clone(), JsonValue::Null);
                    }
                    None => {}
                }
            }
        }
        None => {
            for (key, value) in all {
                if !filter_empty || !is_blank(&value) {
                    obj.insert(key, value);
                }
            }
        }
    }

    Ok(JsonValue::Object(obj))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ContentKind;

    fn page() -> Page {
        Page::parse(
            "posts/momentum.md",
            "+++\ntitle = \"Momentum\"\ndate = 2023-02-01\nmath = true\n+++\n",
            ContentKind::Markdown,
            &Permalinks::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_format_all_fields() {
        let value = format_page(&page(), "content/posts/momentum.md".into(), None, false).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(&keys[..3], ["path", "url", "kind"]);
        assert_eq!(value["url"], "/posts/momentum/");
        assert_eq!(value["format"], "toml");
        assert_eq!(value["date"], "2023-02-01");
        assert_eq!(value["math"], true);
        assert!(value["description"].is_null());
    }

    #[test]
    fn test_url_from_route_not_front_matter() {
        let custom = Page::parse(
            "posts/spx.md",
            "---\ntitle: SPX\nurl: /notes/spx\nkind: custom\n---\n",
            ContentKind::Markdown,
            &Permalinks::default(),
        )
        .unwrap();
        let value = format_page(&custom, "content/posts/spx.md".into(), None, false).unwrap();
        assert_eq!(value["url"], "/notes/spx/");
        assert_eq!(value["kind"], serde_json::to_value(custom.kind).unwrap());

        // Without a front-matter url the computed one is kept
        let value = format_page(&page(), "p".into(), None, false).unwrap();
        assert_eq!(value["url"], "/posts/momentum/");
    }

    #[test]
    fn test_filter_empty() {
        let value = format_page(&page(), "p".into(), None, true).unwrap();
        let obj = value.as_object().unwrap();
        assert!(!obj.contains_key("description"));
        assert!(!obj.contains_key("tags"));
        assert!(obj.contains_key("title"));
    }

    #[test]
    fn test_selected_fields() {
        let fields = vec!["title".to_owned(), "nope".to_owned()];
        let value = format_page(&page(), "p".into(), Some(&fields), false).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["path", "url", "title", "nope"]);
        assert!(value["nope"].is_null());

        let value = format_page(&page(), "p".into(), Some(&fields), true).unwrap();
        assert_eq!(value.as_object().unwrap().len(), 3);
    }
}
