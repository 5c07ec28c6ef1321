//! Backtest error types.

use std::path::PathBuf;
use thiserror::Error;

use crate::utils::date::Date;

/// Problems reading the CSV inputs.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("cannot read `{0}`")]
    Csv(PathBuf, #[source] csv::Error),

    #[error("`{path}` is missing column `{column}`")]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("`{path}` line {line}: {message}")]
    Row {
        path: PathBuf,
        line: u64,
        message: String,
    },

    #[error("`{0}` has no rows")]
    Empty(PathBuf),
}

#[derive(Debug, Error)]
pub enum BacktestError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error("no constituent snapshot recorded, cannot anchor membership replay")]
    NoSnapshot,

    #[error("lookback of {lookback} days needs more history: prices start {first}, analysis starts {start}")]
    NotEnoughHistory {
        lookback: usize,
        first: Date,
        start: Date,
    },

    #[error("no trading days between {start} and {end}")]
    EmptyWindow { start: Date, end: Date },

    #[error("{0} must be positive")]
    NonPositive(&'static str),
}
