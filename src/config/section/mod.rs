//! `folio.toml` section definitions.

mod backtest;
mod check;
mod site;

pub use backtest::BacktestSection;
pub use check::{CheckLevel, CheckSection};
pub use site::{SITE_CONFIG_CANDIDATES, SiteSection};
