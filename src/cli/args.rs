//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

use crate::backtest::Rebalance;
use crate::config::CheckLevel;
use crate::utils::date::Date;

/// Site checker and momentum backtest runner
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: folio.toml, searched upward)
    #[arg(short = 'C', long, global = true, default_value = "folio.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Content directory path (relative to project root)
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub content: Option<PathBuf>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Write a commented folio.toml template
    #[command(visible_alias = "i")]
    Init {
        /// Print the template instead of writing it
        #[arg(short, long)]
        dry: bool,

        /// Overwrite an existing folio.toml
        #[arg(short, long)]
        force: bool,
    },

    /// Validate site config, menus, taxonomies and content front matter
    #[command(visible_alias = "c")]
    Check {
        #[command(flatten)]
        args: CheckArgs,
    },

    /// Query metadata from content files
    #[command(visible_alias = "q")]
    Query {
        #[command(flatten)]
        args: QueryArgs,
    },

    /// Run the constituent momentum backtest
    #[command(visible_alias = "b")]
    Backtest {
        #[command(flatten)]
        args: BacktestArgs,
    },
}

/// Check command arguments.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct CheckArgs {
    /// Files or directories to check. If omitted, checks all content.
    /// Use `-` to read paths from stdin.
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Include draft pages
    #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub drafts: Option<bool>,

    /// How to report broken internal links
    #[arg(short, long, value_enum)]
    pub links: Option<CheckLevel>,

    /// Skip site config checks, only check content files
    #[arg(long)]
    pub content_only: bool,

    /// Treat check failures as warnings instead of errors
    #[arg(long, short = 'w')]
    pub warn_only: bool,
}

/// Query command arguments.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct QueryArgs {
    /// Paths to query (files, directories, or omit for all content).
    /// Use `-` to read paths from stdin (one per line).
    #[arg(value_hint = clap::ValueHint::AnyPath)]
    pub paths: Vec<PathBuf>,

    /// Include draft pages in results
    #[arg(short, long)]
    pub drafts: bool,

    /// Pretty-print JSON output
    #[arg(short, long)]
    pub pretty: bool,

    /// Filter out null/empty values from output
    #[arg(short = 'E', long)]
    pub filter_empty: bool,

    /// Filter output to specific fields (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub fields: Option<Vec<String>>,

    /// Write output to file instead of stdout
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

/// Backtest command arguments. Every flag overrides `[backtest]`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct BacktestArgs {
    /// Directory holding the CSV inputs
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub data: Option<PathBuf>,

    /// Momentum lookback in trading days
    #[arg(short, long)]
    pub lookback: Option<usize>,

    /// Number of securities held
    #[arg(short, long)]
    pub top: Option<usize>,

    /// Rebalance schedule
    #[arg(short, long, value_enum)]
    pub rebalance: Option<Rebalance>,

    /// First analysis date (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<Date>,

    /// Last analysis date (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<Date>,

    /// Initial capital
    #[arg(long)]
    pub capital: Option<f64>,

    /// Transaction cost in basis points of turnover
    #[arg(long)]
    pub cost_bps: Option<f64>,

    /// Only replay membership and compare against recorded snapshots
    #[arg(long)]
    pub verify: bool,

    /// Write the NAV series to a file (.csv or .json)
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

#[allow(unused)]
impl Cli {
    pub const fn is_init(&self) -> bool {
        matches!(self.command, Commands::Init { .. })
    }
    pub const fn is_backtest(&self) -> bool {
        matches!(self.command, Commands::Backtest { .. })
    }
    /// Commands that read the content tree.
    pub const fn reads_content(&self) -> bool {
        matches!(self.command, Commands::Check { .. } | Commands::Query { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check() {
        let cli = Cli::parse_from(["folio", "check", "posts", "--links", "error", "-w"]);
        match cli.command {
            Commands::Check { args } => {
                assert_eq!(args.paths, vec![PathBuf::from("posts")]);
                assert_eq!(args.links, Some(CheckLevel::Error));
                assert!(args.warn_only);
                assert_eq!(args.drafts, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_backtest_overrides() {
        let cli = Cli::parse_from([
            "folio",
            "backtest",
            "--top",
            "5",
            "--rebalance",
            "weekly",
            "--start",
            "2020-01-02",
            "-v",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Backtest { args } => {
                assert_eq!(args.top, Some(5));
                assert_eq!(args.rebalance, Some(Rebalance::Weekly));
                assert_eq!(args.start, Some(Date::from_ymd(2020, 1, 2)));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_bad_date_rejected() {
        let result = Cli::try_parse_from(["folio", "backtest", "--start", "2020-13-01"]);
        assert!(result.is_err());
    }
}
