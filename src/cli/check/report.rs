//! Check report types and formatting.

use std::collections::BTreeMap;
use std::fmt;

use owo_colors::Style;

use crate::core::{Issue, Severity};
use crate::logger::epaint;
use crate::utils::plural_s;

/// Findings grouped by source file, printed in path order.
#[derive(Debug, Default)]
pub struct CheckReport {
    sources: BTreeMap<String, Vec<Issue>>,
}

impl CheckReport {
    pub fn add(&mut self, source: impl Into<String>, issue: Issue) {
        self.sources.entry(source.into()).or_default().push(issue);
    }

    pub fn extend(&mut self, source: &str, issues: impl IntoIterator<Item = Issue>) {
        let mut issues = issues.into_iter().peekable();
        if issues.peek().is_some() {
            self.sources
                .entry(source.to_owned())
                .or_default()
                .extend(issues);
        }
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    /// Number of sources with at least one error.
    pub fn failed_file_count(&self) -> usize {
        self.sources
            .values()
            .filter(|issues| issues.iter().any(Issue::is_error))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn issues(&self, source: &str) -> &[Issue] {
        self.sources.get(source).map_or(&[], Vec::as_slice)
    }

    fn count(&self, severity: Severity) -> usize {
        self.sources
            .values()
            .flatten()
            .filter(|issue| issue.severity == severity)
            .count()
    }

    /// Print every finding to stderr, errors before warnings within a file.
    pub fn print(&self) {
        for (source, issues) in &self.sources {
            eprintln!(
                "{}{}{}",
                epaint("[", Style::new().dimmed()),
                epaint(source, Style::new().cyan()),
                epaint("]", Style::new().dimmed())
            );
            let mut sorted: Vec<_> = issues.iter().collect();
            sorted.sort_by_key(|issue| issue.severity);
            for issue in sorted {
                let arrow = match issue.severity {
                    Severity::Error => epaint("→", Style::new().red()),
                    Severity::Warning => epaint("→", Style::new().yellow()),
                };
                if issue.target.is_empty() {
                    eprintln!("{arrow} {}", issue.message);
                } else {
                    eprintln!("{arrow} {} {}", epaint(&issue.target, Style::new().bold()), issue.message);
                }
            }
        }
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let errors = self.error_count();
        let warnings = self.warning_count();

        if errors == 0 && warnings == 0 {
            return write!(f, "{}", epaint("all checks passed", Style::new().green()));
        }
        write!(
            f,
            "{} {} {}, {} {}",
            epaint("found", Style::new().dimmed()),
            epaint(errors, Style::new().red().bold()),
            epaint(format_args!("error{}", plural_s(errors)), Style::new().dimmed()),
            epaint(warnings, Style::new().yellow().bold()),
            epaint(format_args!("warning{}", plural_s(warnings)), Style::new().dimmed())
        )
    }
}
