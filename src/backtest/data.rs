//! CSV inputs of the backtest.
//!
//! | File             | Columns                                   |
//! |------------------|-------------------------------------------|
//! | membership       | `date,ticker,action` (`added`/`removed`)  |
//! | snapshots        | `date,ticker`                             |
//! | prices (long)    | `date,ticker,close`                       |
//! | prices (wide)    | `date,<TICKER>,<TICKER>,...`              |
//! | benchmark        | `date,close`                              |
//!
//! Header names are matched case-insensitively, cells are trimmed and
//! tickers uppercased.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::error::DataError;
use crate::config::BacktestSection;
use crate::utils::date::Date;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    #[serde(alias = "add", alias = "Added", alias = "ADDED")]
    Added,
    #[serde(alias = "remove", alias = "Removed", alias = "REMOVED")]
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MembershipEvent {
    pub date: Date,
    pub ticker: String,
    pub action: Action,
}

impl MembershipEvent {
    pub fn new(date: Date, ticker: &str, action: Action) -> Self {
        Self {
            date,
            ticker: ticker.to_uppercase(),
            action,
        }
    }
}

/// Constituent sets recorded on specific dates.
pub type Snapshots = BTreeMap<Date, BTreeSet<String>>;

/// Daily closes aligned on one ascending date axis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    dates: Vec<Date>,
    closes: BTreeMap<String, Vec<Option<f64>>>,
}

impl PriceTable {
    /// Pivot long `(date, ticker, close)` rows onto a shared date axis.
    pub fn from_long(rows: impl IntoIterator<Item = (Date, String, f64)>) -> Self {
        let rows: Vec<_> = rows.into_iter().collect();
        let dates: Vec<Date> = rows
            .iter()
            .map(|(date, _, _)| *date)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut closes: BTreeMap<String, Vec<Option<f64>>> = BTreeMap::new();
        for (date, ticker, close) in rows {
            let Ok(i) = dates.binary_search(&date) else {
                continue;
            };
            closes.entry(ticker).or_insert_with(|| vec![None; dates.len()])[i] = Some(close);
        }
        Self { dates, closes }
    }

    pub fn dates(&self) -> &[Date] {
        &self.dates
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.closes.keys().map(String::as_str)
    }

    /// Close of `ticker` on the `i`-th trading day.
    pub fn close(&self, ticker: &str, i: usize) -> Option<f64> {
        self.closes.get(ticker)?.get(i).copied().flatten()
    }

    /// Index of the first trading day on or after `date`.
    pub fn first_on_or_after(&self, date: Date) -> usize {
        self.dates.partition_point(|d| *d < date)
    }

    /// Number of trading days on or before `date`.
    pub fn count_on_or_before(&self, date: Date) -> usize {
        self.dates.partition_point(|d| *d <= date)
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Everything the backtest reads from disk.
#[derive(Debug, Clone, Default)]
pub struct MarketData {
    /// Sorted by date, file order kept within a date
    pub membership: Vec<MembershipEvent>,
    pub snapshots: Snapshots,
    pub prices: PriceTable,
    /// `(date, level)` sorted by date
    pub benchmark: Option<Vec<(Date, f64)>>,
}

impl MarketData {
    pub fn load(section: &BacktestSection) -> Result<Self, DataError> {
        let benchmark = match &section.benchmark {
            Some(name) if section.data_file(name).is_file() => {
                Some(load_benchmark(&section.data_file(name))?)
            }
            Some(name) => {
                crate::debug!("backtest"; "no benchmark at {}, skipping", section.data_file(name).display());
                None
            }
            None => None,
        };

        Ok(Self {
            membership: load_membership(&section.data_file(&section.membership))?,
            snapshots: load_snapshots(&section.data_file(&section.snapshots))?,
            prices: load_prices(&section.data_file(&section.prices))?,
            benchmark,
        })
    }
}

/// Events may be empty: the anchor snapshot alone then defines membership.
pub fn load_membership(path: &Path) -> Result<Vec<MembershipEvent>, DataError> {
    let mut events: Vec<MembershipEvent> = read_rows(path, &["date", "ticker", "action"])?;
    for event in &mut events {
        event.ticker = event.ticker.to_uppercase();
    }
    // Stable: same-day events keep file order
    events.sort_by_key(|event| event.date);
    Ok(events)
}

pub fn load_snapshots(path: &Path) -> Result<Snapshots, DataError> {
    #[derive(Deserialize)]
    struct Row {
        date: Date,
        ticker: String,
    }

    let rows: Vec<Row> = non_empty(path, read_rows(path, &["date", "ticker"])?)?;
    let mut snapshots = Snapshots::new();
    for row in rows {
        snapshots
            .entry(row.date)
            .or_default()
            .insert(row.ticker.to_uppercase());
    }
    Ok(snapshots)
}

pub fn load_benchmark(path: &Path) -> Result<Vec<(Date, f64)>, DataError> {
    #[derive(Deserialize)]
    struct Row {
        date: Date,
        close: f64,
    }

    let rows: Vec<Row> = non_empty(path, read_rows(path, &["date", "close"])?)?;
    let mut seen = BTreeSet::new();
    let mut series = Vec::with_capacity(rows.len());
    for (i, row) in rows.into_iter().enumerate() {
        if !seen.insert(row.date) {
            return Err(DataError::Row {
                path: path.to_path_buf(),
                line: i as u64 + 2,
                message: format!("duplicate level on {}", row.date),
            });
        }
        series.push((row.date, row.close));
    }
    series.sort_by_key(|(date, _)| *date);
    Ok(series)
}

/// Load closes in either layout, detected from the header.
pub fn load_prices(path: &Path) -> Result<PriceTable, DataError> {
    let mut reader = open(path)?;
    let headers = reader
        .headers()
        .map_err(|err| DataError::Csv(path.to_path_buf(), err))?
        .clone();
    require(path, &headers, &["date"])?;

    let is_long = headers.iter().any(|h| h == "ticker") && headers.iter().any(|h| h == "close");
    let table = if is_long {
        read_long_prices(path, reader)?
    } else {
        read_wide_prices(path, &headers, reader)?
    };

    if table.is_empty() {
        return Err(DataError::Empty(path.to_path_buf()));
    }
    Ok(table)
}

fn read_long_prices(path: &Path, mut reader: csv::Reader<File>) -> Result<PriceTable, DataError> {
    #[derive(Deserialize)]
    struct Row {
        date: Date,
        ticker: String,
        close: Option<f64>,
    }

    let mut seen = BTreeSet::new();
    let mut rows = Vec::new();
    for (i, row) in reader.deserialize::<Row>().enumerate() {
        let row = row.map_err(|err| DataError::Csv(path.to_path_buf(), err))?;
        let ticker = row.ticker.to_uppercase();
        if !seen.insert((row.date, ticker.clone())) {
            return Err(DataError::Row {
                path: path.to_path_buf(),
                line: i as u64 + 2,
                message: format!("duplicate close for {ticker} on {}", row.date),
            });
        }
        if let Some(close) = row.close {
            rows.push((row.date, ticker, close));
        }
    }
    Ok(PriceTable::from_long(rows))
}

fn read_wide_prices(
    path: &Path,
    headers: &csv::StringRecord,
    mut reader: csv::Reader<File>,
) -> Result<PriceTable, DataError> {
    let date_col = headers.iter().position(|h| h == "date").unwrap_or_default();
    let tickers: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != date_col)
        .map(|(i, h)| (i, h.to_uppercase()))
        .collect();

    let mut seen = BTreeSet::new();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| DataError::Csv(path.to_path_buf(), err))?;
        let line = record.position().map_or(0, csv::Position::line);
        let row_error = |message: String| DataError::Row {
            path: path.to_path_buf(),
            line,
            message,
        };

        let raw_date = record.get(date_col).unwrap_or_default();
        let date = Date::parse(raw_date).ok_or_else(|| row_error(format!("invalid date `{raw_date}`")))?;
        if !seen.insert(date) {
            return Err(row_error(format!("duplicate row for {date}")));
        }

        for (col, ticker) in &tickers {
            let cell = record.get(*col).unwrap_or_default();
            if cell.is_empty() {
                continue;
            }
            let close: f64 = cell
                .parse()
                .map_err(|_| row_error(format!("invalid close `{cell}` for {ticker}")))?;
            rows.push((date, ticker.clone(), close));
        }
    }
    Ok(PriceTable::from_long(rows))
}

fn open(path: &Path) -> Result<csv::Reader<File>, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|err| DataError::Csv(path.to_path_buf(), err))?;

    let headers: csv::StringRecord = reader
        .headers()
        .map_err(|err| DataError::Csv(path.to_path_buf(), err))?
        .iter()
        .map(str::to_lowercase)
        .collect();
    reader.set_headers(headers);
    Ok(reader)
}

fn require(path: &Path, headers: &csv::StringRecord, columns: &[&'static str]) -> Result<(), DataError> {
    match columns.iter().find(|column| !headers.iter().any(|h| h == **column)) {
        Some(column) => Err(DataError::MissingColumn {
            path: PathBuf::from(path),
            column: *column,
        }),
        None => Ok(()),
    }
}

fn read_rows<T: DeserializeOwned>(path: &Path, columns: &[&'static str]) -> Result<Vec<T>, DataError> {
    let mut reader = open(path)?;
    let headers = reader
        .headers()
        .map_err(|err| DataError::Csv(path.to_path_buf(), err))?
        .clone();
    require(path, &headers, columns)?;

    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|err| DataError::Csv(path.to_path_buf(), err))
}

fn non_empty<T>(path: &Path, rows: Vec<T>) -> Result<Vec<T>, DataError> {
    if rows.is_empty() {
        return Err(DataError::Empty(path.to_path_buf()));
    }
    Ok(rows)
}
