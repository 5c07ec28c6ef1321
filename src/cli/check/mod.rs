//! Site check command.
//!
//! Runs in three passes:
//! 1. the site config document (schema, menus, taxonomies, permalinks),
//! 2. every content file in parallel (front matter, dates, taxonomy fields),
//! 3. site-wide properties (duplicate URLs, internal links, menu targets).

mod index;
mod report;

use std::path::PathBuf;

use anyhow::Result;
use parking_lot::RwLock;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};

use super::common::{collect_content_files, load_pages, load_site};
use crate::cli::CheckArgs;
use crate::config::{CheckLevel, FolioConfig};
use crate::core::Issue;
use crate::page::Page;
use crate::site::{Permalinks, SiteCheck, SiteDocument, Taxonomies};
use crate::utils::path::relative_slash;
use crate::utils::{plural_count, plural_s};
use crate::{debug, log};

pub use index::SiteIndex;
pub use report::CheckReport;

/// Check the site config and content tree.
pub fn run_check(args: &CheckArgs, config: &FolioConfig) -> Result<()> {
    let root = &config.root;
    let mut report = CheckReport::default();

    let site = if args.content_only {
        None
    } else {
        check_site(config, &mut report)
    };
    let (permalinks, taxonomies) = match &site {
        Some(site) => (site.permalinks.clone(), site.taxonomies.clone()),
        None => (Permalinks::default(), Taxonomies::default()),
    };

    // Links resolve against the whole site even when only some files are checked
    let content_dir = &config.site.content;
    let all_files = collect_content_files(&[], content_dir)?;
    let selected: FxHashSet<PathBuf> = if args.paths.is_empty() {
        all_files.iter().cloned().collect()
    } else {
        collect_content_files(&args.paths, content_dir)?
            .into_iter()
            .collect()
    };

    if selected.is_empty() {
        log!("check"; "no content files found");
    } else {
        log!("check"; "checking {}", plural_count(selected.len(), "file"));
    }

    let (pages, failures) = load_pages(&all_files, content_dir, &permalinks);
    for failure in failures {
        let file = content_dir.join(&failure.source);
        if selected.contains(&file) {
            report.add(
                relative_slash(&file, root),
                Issue::error("front matter", format!("{:#}", failure.error)),
            );
        }
    }

    let pages: Vec<Page> = pages
        .into_iter()
        .filter(|page| {
            let keep = config.check.drafts || !page.is_draft();
            if !keep {
                debug!("check"; "skipping draft {}", page.relative);
            }
            keep
        })
        .collect();

    let plurals: Vec<&str> = taxonomies.plurals().collect();
    let index = SiteIndex::build(&pages, &taxonomies, content_dir, &config.site.static_dir);
    let links = config.check.links;

    let report = RwLock::new(report);
    pages
        .par_iter()
        .filter(|page| selected.contains(&page.source))
        .for_each(|page| {
            let mut issues = check_page(page, &config.check.required, &plurals);
            if links != CheckLevel::Off {
                issues.extend(check_links(page, &index, links));
            }
            let source = relative_slash(&page.source, root);
            report.write().extend(&source, issues);
        });
    let mut report = report.into_inner();

    for (source, issue) in duplicate_urls(&pages) {
        let file = content_dir.join(&source);
        if selected.contains(&file) {
            report.add(relative_slash(&file, root), issue);
        }
    }

    if let Some(site) = &site
        && links != CheckLevel::Off
    {
        let source = site_source(site, config);
        for menu in &site.menus {
            for (target, reason) in index.check_menu(menu) {
                report.add(&source, Issue::warning(target, reason));
            }
        }
    }

    finish(&report, args.warn_only)
}

/// Load and validate the site config document. Parse failures are reported
/// like any other finding and the content checks run on defaults.
fn check_site(config: &FolioConfig, report: &mut CheckReport) -> Option<SiteDocument> {
    let site = match load_site(config) {
        Ok(Some(site)) => site,
        Ok(None) => {
            log!("warning"; "no site config found, using default taxonomies and permalinks");
            return None;
        }
        Err(err) => {
            let source = config
                .site
                .resolve_config(&config.root)
                .map(|path| relative_slash(&path, &config.root))
                .unwrap_or_default();
            report.add(source, Issue::error("", format!("{err:#}")));
            return None;
        }
    };

    let unknown = site.unknown_keys();
    if !unknown.is_empty() {
        debug!("site"; "keys not checked: {}", unknown.join(", "));
    }

    let check = SiteCheck {
        root: &config.root,
        menu_order: config.check.menu_order,
    };
    report.extend(&site_source(&site, config), site.validate(&check));
    log!(
        "check";
        "site config: {}, {}",
        plural_count(site.menus.len(), "menu"),
        plural_count(site.taxonomies.len(), "taxonomy")
    );
    Some(site)
}

fn site_source(site: &SiteDocument, config: &FolioConfig) -> String {
    relative_slash(&site.path, &config.root)
}

/// Front-matter checks of one page.
pub fn check_page(page: &Page, required: &[String], plurals: &[&str]) -> Vec<Issue> {
    let mut issues = page.issues.clone();
    for field in required {
        if !page.meta.has_field(field) {
            issues.push(Issue::error(field.as_str(), "is required"));
        }
    }
    issues.extend(page.meta.validate(plurals));
    issues
}

/// Internal links of one page that do not resolve.
pub fn check_links(page: &Page, index: &SiteIndex<'_>, level: CheckLevel) -> Vec<Issue> {
    page.body
        .links
        .iter()
        .filter_map(|link| {
            let reason = index.check_link(page, link)?;
            Some(match level {
                CheckLevel::Error => Issue::error(link.target.as_str(), reason),
                _ => Issue::warning(link.target.as_str(), reason),
            })
        })
        .collect()
}

/// Pages (by content path) whose URL or alias is also claimed elsewhere.
pub fn duplicate_urls(pages: &[Page]) -> Vec<(String, Issue)> {
    let mut claims: FxHashMap<&str, Vec<&str>> = FxHashMap::default();
    for page in pages {
        claims
            .entry(&page.route.url)
            .or_default()
            .push(&page.relative);
        for alias in &page.route.aliases {
            claims.entry(alias).or_default().push(&page.relative);
        }
    }

    let mut duplicates = Vec::new();
    for (url, sources) in claims {
        if sources.len() < 2 {
            continue;
        }
        for (i, source) in sources.iter().enumerate() {
            let others: Vec<&str> = sources
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, other)| *other)
                .collect();
            duplicates.push((
                (*source).to_owned(),
                Issue::error(url, format!("also published by {}", others.join(", "))),
            ));
        }
    }
    duplicates.sort_by(|a, b| (&a.0, &a.1.target).cmp(&(&b.0, &b.1.target)));
    duplicates
}

/// Print the report and fail when it has errors.
fn finish(report: &CheckReport, warn_only: bool) -> Result<()> {
    if !report.is_empty() {
        eprintln!();
        report.print();
        eprintln!();
    }
    log!("check"; "{}", report);

    let errors = report.error_count();
    if errors > 0 && !warn_only {
        anyhow::bail!(
            "check failed: {} error{} in {}",
            errors,
            plural_s(errors),
            plural_count(report.failed_file_count(), "file")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ContentKind;
    use std::fs;

    fn page(relative: &str, content: &str) -> Page {
        Page::parse(relative, content, ContentKind::Markdown, &Permalinks::default()).unwrap()
    }

    fn required() -> Vec<String> {
        vec!["title".into(), "date".into()]
    }

    #[test]
    fn test_required_fields() {
        let page = page("posts/a.md", "---\ntitle: \"\"\ndraft: true\n---\n");
        let issues = check_page(&page, &required(), &["tags"]);
        let targets: Vec<_> = issues.iter().map(|i| i.target.as_str()).collect();
        assert_eq!(targets, vec!["title", "date"]);
        assert!(issues.iter().all(Issue::is_error));
    }

    #[test]
    fn test_valid_page_has_no_issues() {
        let page = page(
            "posts/a.md",
            "---\ntitle: A\ndate: 2023-05-01T10:00:00+02:00\nlastmod: 2023-06-01\ntags: [quant]\n---\n",
        );
        assert!(check_page(&page, &required(), &["tags", "categories"]).is_empty());
    }

    #[test]
    fn test_taxonomy_shape_and_dates() {
        let page = page(
            "posts/a.md",
            "---\ntitle: A\ndate: 2023-13-01\nseries: {a: 1}\n---\n",
        );
        let issues = check_page(&page, &required(), &["tags", "series"]);
        assert!(issues.iter().any(|i| i.target == "date" && i.is_error()));
        assert!(issues.iter().any(|i| i.target == "series" && i.is_error()));
    }

    #[test]
    fn test_duplicate_urls() {
        let pages = vec![
            page("posts/a.md", "---\ntitle: A\nurl: /same/\n---\n"),
            page("posts/b.md", "---\ntitle: B\naliases: [/same/]\n---\n"),
            page("posts/c.md", "---\ntitle: C\n---\n"),
        ];
        let dups = duplicate_urls(&pages);
        assert_eq!(dups.len(), 2);
        assert_eq!(dups[0].0, "posts/a.md");
        assert_eq!(dups[0].1.target, "/same/");
        assert!(dups[0].1.message.contains("posts/b.md"));
        assert_eq!(dups[1].0, "posts/b.md");
    }

    #[test]
    fn test_link_level() {
        let pages = vec![page("a.md", "---\ntitle: A\n---\n[x](/missing/)\n")];
        let dir = tempfile::tempdir().unwrap();
        let index = SiteIndex::build(&pages, &Taxonomies::default(), dir.path(), dir.path());

        let warn = check_links(&pages[0], &index, CheckLevel::Warn);
        assert_eq!(warn.len(), 1);
        assert!(!warn[0].is_error());
        let error = check_links(&pages[0], &index, CheckLevel::Error);
        assert!(error[0].is_error());
    }

    fn site_fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(
            root.join("hugo.toml"),
            r#"
baseURL = "https://example.org/"
title = "Notes"

[[menu.main]]
name = "Posts"
url = "/posts/"
weight = 1

[[menu.main]]
name = "About"
pageRef = "/about"
weight = 2
"#,
        )
        .unwrap();
        fs::create_dir_all(root.join("content/posts")).unwrap();
        fs::write(root.join("content/about.md"), "---\ntitle: About\ndate: 2023-01-01\n---\n").unwrap();
        fs::write(
            root.join("content/posts/momentum.md"),
            "---\ntitle: Momentum\ndate: 2023-02-01\n---\nSee [about](/about/).\n",
        )
        .unwrap();
        dir
    }

    fn config_for(root: &std::path::Path) -> FolioConfig {
        let mut config = FolioConfig {
            root: root.to_path_buf(),
            ..Default::default()
        };
        config.site.normalize(root);
        config
    }

    #[test]
    fn test_run_check_passes() {
        let dir = site_fixture();
        let config = config_for(dir.path());
        run_check(&CheckArgs::default(), &config).unwrap();
    }

    #[test]
    fn test_run_check_fails_on_errors() {
        let dir = site_fixture();
        fs::write(
            dir.path().join("content/posts/untitled.md"),
            "---\ndate: 2023-03-01\n---\n",
        )
        .unwrap();
        let config = config_for(dir.path());

        assert!(run_check(&CheckArgs::default(), &config).is_err());

        let warn_only = CheckArgs {
            warn_only: true,
            ..Default::default()
        };
        assert!(run_check(&warn_only, &config).is_ok());
    }

    #[test]
    fn test_run_check_selected_paths() {
        let dir = site_fixture();
        fs::write(dir.path().join("content/broken.md"), "no front matter").unwrap();
        let config = config_for(dir.path());

        let args = CheckArgs {
            paths: vec![dir.path().join("content/posts")],
            ..Default::default()
        };
        assert!(run_check(&args, &config).is_ok());
    }
}
