//! NAV series export.
//!
//! The format follows the output extension: `.csv` writes one row per day,
//! `.json` writes the summary and the daily records as one document.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Serialize;

use super::metrics::Summary;
use super::portfolio::{DayRecord, RebalanceRecord};
use crate::utils::date::Date;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// CSV rows keep every column so rows without a benchmark level stay aligned.
#[derive(Serialize)]
struct CsvRow {
    date: Date,
    #[serde(rename = "return")]
    ret: f64,
    nav: f64,
    equity: f64,
    holdings: usize,
    constituents: usize,
    rebalanced: bool,
    turnover: f64,
    benchmark: Option<f64>,
}

impl From<&DayRecord> for CsvRow {
    fn from(day: &DayRecord) -> Self {
        Self {
            date: day.date,
            ret: day.ret,
            nav: day.nav,
            equity: day.equity,
            holdings: day.holdings,
            constituents: day.constituents,
            rebalanced: day.rebalanced,
            turnover: day.turnover,
            benchmark: day.benchmark,
        }
    }
}

#[derive(Serialize)]
struct JsonExport<'a> {
    summary: Option<&'a Summary>,
    rebalances: &'a [RebalanceRecord],
    days: &'a [DayRecord],
}

/// Write the run to `path`, creating parent directories as needed.
pub fn write(
    path: &Path,
    days: &[DayRecord],
    rebalances: &[RebalanceRecord],
    summary: Option<&Summary>,
) -> Result<()> {
    let Some(format) = ExportFormat::from_path(path) else {
        bail!(
            "unsupported output format `{}` (use .csv or .json)",
            path.display()
        );
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create `{}`", parent.display()))?;
    }

    match format {
        ExportFormat::Csv => write_csv(path, days),
        ExportFormat::Json => {
            let file = File::create(path)
                .with_context(|| format!("failed to create `{}`", path.display()))?;
            let export = JsonExport {
                summary,
                rebalances,
                days,
            };
            serde_json::to_writer_pretty(BufWriter::new(file), &export)
                .with_context(|| format!("failed to write `{}`", path.display()))
        }
    }
}

fn write_csv(path: &Path, days: &[DayRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create `{}`", path.display()))?;
    for day in days {
        writer.serialize(CsvRow::from(day))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to write `{}`", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn days() -> Vec<DayRecord> {
        [(2, 0.0, 1.0, None), (3, 0.01, 1.01, Some(1.02))]
            .into_iter()
            .map(|(day, ret, nav, benchmark)| DayRecord {
                date: Date::from_ymd(2024, 1, day),
                ret,
                nav,
                equity: nav * 100.0,
                holdings: 2,
                constituents: 3,
                rebalanced: day == 2,
                turnover: if day == 2 { 1.0 } else { 0.0 },
                benchmark,
            })
            .collect()
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ExportFormat::from_path(Path::new("nav.CSV")), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::from_path(Path::new("out/nav.json")), Some(ExportFormat::Json));
        assert_eq!(ExportFormat::from_path(Path::new("nav.txt")), None);
        assert_eq!(ExportFormat::from_path(Path::new("nav")), None);
    }

    #[test]
    fn test_write_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/nav.csv");
        write(&path, &days(), &[], None).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(
            lines[0],
            "date,return,nav,equity,holdings,constituents,rebalanced,turnover,benchmark"
        );
        assert_eq!(lines[1], "2024-01-02,0.0,1.0,100.0,2,3,true,1.0,");
        assert!(lines[2].starts_with("2024-01-03,0.01,1.01,"));
        assert!(lines[2].ends_with(",1.02"));
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nav.json");
        write(&path, &days(), &[], None).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(value["summary"].is_null());
        assert_eq!(value["days"][1]["date"], "2024-01-03");
        assert_eq!(value["days"][1]["return"], 0.01);
        assert!(value["days"][0].get("benchmark").is_none());
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        assert!(write(&dir.path().join("nav.xlsx"), &days(), &[], None).is_err());
    }
}
