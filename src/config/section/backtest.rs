//! `[backtest]` section: inputs and parameters of the momentum backtest.
//!
//! ```toml
//! [backtest]
//! data = "data"
//! membership = "membership.csv"
//! snapshots = "snapshots.csv"
//! prices = "prices.csv"
//! benchmark = "benchmark.csv"
//! lookback = 20
//! top = 10
//! rebalance = "daily"     # daily | weekly | monthly
//! start = "2019-01-02"
//! end = "2023-12-29"
//! capital = 1000000.0
//! cost_bps = 0.0
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::backtest::Rebalance;
use crate::config::{ConfigDiagnostics, FieldPath};
use crate::utils::date::Date;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSection {
    /// Directory holding the CSV inputs.
    pub data: PathBuf,

    /// Index membership change events (`date,ticker,action`).
    pub membership: PathBuf,

    /// Recorded constituent snapshots (`date,ticker`).
    pub snapshots: PathBuf,

    /// Daily closes, long (`date,ticker,close`) or wide (`date,<ticker>...`).
    pub prices: PathBuf,

    /// Benchmark index levels (`date,close`). Skipped when the file is absent.
    pub benchmark: Option<PathBuf>,

    /// Momentum lookback in trading days.
    pub lookback: usize,

    /// Number of securities held.
    pub top: usize,

    pub rebalance: Rebalance,

    /// First analysis date (inclusive).
    pub start: Option<Date>,

    /// Last analysis date (inclusive).
    pub end: Option<Date>,

    /// Initial capital used to scale the NAV into equity.
    pub capital: f64,

    /// Transaction cost charged on turnover, in basis points.
    pub cost_bps: f64,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            data: "data".into(),
            membership: "membership.csv".into(),
            snapshots: "snapshots.csv".into(),
            prices: "prices.csv".into(),
            benchmark: Some("benchmark.csv".into()),
            lookback: 20,
            top: 10,
            rebalance: Rebalance::Daily,
            start: None,
            end: None,
            capital: 1_000_000.0,
            cost_bps: 0.0,
        }
    }
}

impl BacktestSection {
    pub const LOOKBACK: FieldPath = FieldPath::new("backtest.lookback");
    pub const TOP: FieldPath = FieldPath::new("backtest.top");
    pub const START: FieldPath = FieldPath::new("backtest.start");
    pub const CAPITAL: FieldPath = FieldPath::new("backtest.capital");
    pub const COST_BPS: FieldPath = FieldPath::new("backtest.cost_bps");

    /// Full path of a data file.
    pub fn data_file(&self, name: &Path) -> PathBuf {
        self.data.join(name)
    }

    /// Make the data directory absolute against `root`.
    pub fn normalize(&mut self, root: &Path) {
        self.data = root.join(&self.data);
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.lookback == 0 {
            diag.error_with_hint(
                Self::LOOKBACK,
                "must be at least 1 trading day",
                "20 trading days is roughly one month",
            );
        }
        if self.top == 0 {
            diag.error(Self::TOP, "must hold at least 1 security");
        }
        if let (Some(start), Some(end)) = (self.start, self.end)
            && start > end
        {
            diag.error(
                Self::START,
                format!("start {start} is after end {end}"),
            );
        }
        if !(self.capital.is_finite() && self.capital > 0.0) {
            diag.error(Self::CAPITAL, "must be a positive amount");
        }
        if !(self.cost_bps.is_finite() && self.cost_bps >= 0.0) {
            diag.error(Self::COST_BPS, "must be zero or positive");
        }
    }
}
