//! folio - site checker and momentum backtest runner for a content-driven blog.

#![allow(dead_code)]

mod backtest;
mod cli;
mod config;
mod core;
mod logger;
mod page;
mod site;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::FolioConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = FolioConfig::load(&cli)?;

    match &cli.command {
        Commands::Init { dry, force } => cli::init::init_config(&config.root, *dry, *force),
        Commands::Check { args } => cli::check::run_check(args, &config),
        Commands::Query { args } => cli::query::run_query(args, &config),
        Commands::Backtest { args } => cli::backtest::run_backtest(args, &config),
    }
}
