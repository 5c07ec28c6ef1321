//! Tool configuration (`folio.toml`).
//!
//! # Sections
//!
//! | Section      | Purpose                                           |
//! |--------------|---------------------------------------------------|
//! | `[site]`     | Site config file, content and static directories  |
//! | `[check]`    | Required front matter, link and menu-order levels |
//! | `[backtest]` | Data files and momentum strategy parameters       |
//!
//! The file is optional: without it every section takes its defaults and
//! the project root is the working directory. CLI flags override the file.

mod diagnostics;
mod error;
pub mod section;
mod util;

pub use diagnostics::{ConfigDiagnostics, FieldPath};
pub use error::ConfigError;
pub use section::{BacktestSection, CheckLevel, CheckSection, SiteSection};

use util::find_config_file;

use crate::cli::{BacktestArgs, CheckArgs, Cli, Commands};
use crate::log;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing folio.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FolioConfig {
    /// Absolute path to the config file; empty when running on defaults.
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory.
    #[serde(skip)]
    pub root: PathBuf,

    pub site: SiteSection,

    pub check: CheckSection,

    pub backtest: BacktestSection,
}

impl FolioConfig {
    /// Load configuration for a CLI invocation.
    ///
    /// Searches upward from cwd for the config file. `init` never reads it.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let found = if cli.is_init() {
            None
        } else {
            find_config_file(&cli.config, &cwd)
        };

        let mut config = match &found {
            Some(path) => Self::from_path(path)?,
            None => {
                crate::debug!("config"; "no {} found, using defaults", cli.config.display());
                Self::default()
            }
        };

        let root = found
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or(cwd);

        config.config_path = found.unwrap_or_default();
        config.finalize(cli, &root);
        config.validate(cli)?;
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {} are ignored:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Set the root, normalize paths, and apply CLI overrides.
    fn finalize(&mut self, cli: &Cli, root: &Path) {
        crate::logger::set_verbose(cli.verbose);

        self.root = crate::utils::path::normalize_path(root);
        Self::update_option(&mut self.site.content, cli.content.as_ref());
        self.apply_command_options(cli);

        let root = self.root.clone();
        self.site.normalize(&root);
        self.backtest.normalize(&root);
    }

    /// Join a path with the root directory.
    pub fn root_join(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    fn apply_command_options(&mut self, cli: &Cli) {
        match &cli.command {
            Commands::Check { args } => self.apply_check_args(args),
            Commands::Backtest { args } => self.apply_backtest_args(args),
            Commands::Query { .. } | Commands::Init { .. } => {}
        }
    }

    fn apply_check_args(&mut self, args: &CheckArgs) {
        Self::update_option(&mut self.check.drafts, args.drafts.as_ref());
        Self::update_option(&mut self.check.links, args.links.as_ref());
    }

    fn apply_backtest_args(&mut self, args: &BacktestArgs) {
        let bt = &mut self.backtest;
        Self::update_option(&mut bt.data, args.data.as_ref());
        Self::update_option(&mut bt.lookback, args.lookback.as_ref());
        Self::update_option(&mut bt.top, args.top.as_ref());
        Self::update_option(&mut bt.rebalance, args.rebalance.as_ref());
        Self::update_option(&mut bt.capital, args.capital.as_ref());
        Self::update_option(&mut bt.cost_bps, args.cost_bps.as_ref());
        if args.start.is_some() {
            bt.start = args.start;
        }
        if args.end.is_some() {
            bt.end = args.end;
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate the sections the current command uses.
    ///
    /// Collects all validation errors and returns them at once.
    pub fn validate(&self, cli: &Cli) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();

        if cli.reads_content() {
            self.site.validate(&mut diag);
            self.check.validate(&mut diag);
        }
        if cli.is_backtest() {
            self.backtest.validate(&mut diag);
        }

        diag.print_warnings();
        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config and panic on unknown fields (to catch typos in tests).
#[cfg(test)]
pub fn test_parse_config(extra: &str) -> FolioConfig {
    let (parsed, ignored) = FolioConfig::parse_with_ignored(extra).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================
