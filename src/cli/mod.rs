//! Command-line interface module.

mod args;
pub mod backtest;
pub mod check;
pub mod common;
pub mod init;
pub mod query;

pub use args::{BacktestArgs, CheckArgs, Cli, Commands, QueryArgs};
