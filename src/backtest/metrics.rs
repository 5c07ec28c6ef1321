//! Summary statistics of a NAV curve.

use serde::Serialize;

use super::portfolio::Simulation;
use crate::utils::date::Date;

const TRADING_DAYS: f64 = 252.0;
const DAYS_PER_YEAR: f64 = 365.25;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub total_return: f64,
    /// Annualized over calendar days
    pub cagr: f64,
    /// Annualized standard deviation of daily returns
    pub volatility: f64,
    /// Risk-free rate taken as zero
    pub sharpe: f64,
    /// Most negative peak-to-trough move, as a fraction (`-0.2` is 20% down)
    pub max_drawdown: f64,
    pub drawdown_peak: Date,
    pub drawdown_trough: Date,
}

impl Metrics {
    /// `None` when the series is empty or lengths differ.
    pub fn compute(dates: &[Date], navs: &[f64]) -> Option<Self> {
        if dates.len() != navs.len() {
            return None;
        }
        let (&first_date, &last_date) = (dates.first()?, dates.last()?);
        let (&first, &last) = (navs.first()?, navs.last()?);

        let growth = last / first;
        let years = first_date.days_until(last_date) as f64 / DAYS_PER_YEAR;
        let cagr = if years > 0.0 {
            growth.powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let returns: Vec<f64> = navs.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
        let (mean, stdev) = mean_stdev(&returns);
        let volatility = stdev * TRADING_DAYS.sqrt();
        let sharpe = if stdev > 0.0 {
            mean / stdev * TRADING_DAYS.sqrt()
        } else {
            0.0
        };

        let (max_drawdown, peak, trough) = max_drawdown(navs);
        Some(Self {
            total_return: growth - 1.0,
            cagr,
            volatility,
            sharpe,
            max_drawdown,
            drawdown_peak: dates[peak],
            drawdown_trough: dates[trough],
        })
    }
}

/// Portfolio and benchmark statistics of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub start: Date,
    pub end: Date,
    pub days: usize,
    pub final_nav: f64,
    pub final_equity: f64,
    pub portfolio: Metrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benchmark: Option<Metrics>,
    pub rebalances: usize,
    pub mean_turnover: f64,
    pub anomalies: usize,
}

impl Summary {
    pub fn from_simulation(sim: &Simulation) -> Option<Self> {
        let (first, last) = (sim.days.first()?, sim.days.last()?);
        let dates = sim.dates();
        let portfolio = Metrics::compute(&dates, &sim.navs())?;
        let benchmark = sim
            .benchmark_navs()
            .and_then(|navs| Metrics::compute(&dates, &navs));

        let mean_turnover = if sim.rebalances.is_empty() {
            0.0
        } else {
            sim.rebalances.iter().map(|r| r.turnover).sum::<f64>() / sim.rebalances.len() as f64
        };

        Some(Self {
            start: first.date,
            end: last.date,
            days: sim.days.len(),
            final_nav: last.nav,
            final_equity: last.equity,
            portfolio,
            benchmark,
            rebalances: sim.rebalances.len(),
            mean_turnover,
            anomalies: sim.anomalies.len(),
        })
    }
}

/// Mean and sample standard deviation.
fn mean_stdev(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return (mean, 0.0);
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, var.sqrt())
}

/// `(drawdown, peak index, trough index)` of the deepest decline.
fn max_drawdown(navs: &[f64]) -> (f64, usize, usize) {
    let mut peak = 0;
    let mut worst = (0.0, 0, 0);
    for (i, &nav) in navs.iter().enumerate() {
        if nav > navs[peak] {
            peak = i;
        }
        let drawdown = nav / navs[peak] - 1.0;
        if drawdown < worst.0 {
            worst = (drawdown, peak, i);
        }
    }
    worst
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dates(n: usize) -> Vec<Date> {
        (0..n).map(|i| Date::from_ymd(2024, 1, 1 + i as u8)).collect()
    }

    #[test]
    fn test_drawdown() {
        let navs = [1.0, 1.2, 0.9, 1.1, 1.3, 1.04];
        let m = Metrics::compute(&dates(6), &navs).unwrap();
        assert!((m.max_drawdown - (-0.25)).abs() < 1e-12);
        assert_eq!(m.drawdown_peak, Date::from_ymd(2024, 1, 2));
        assert_eq!(m.drawdown_trough, Date::from_ymd(2024, 1, 3));
        assert!((m.total_return - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_flat_series() {
        let m = Metrics::compute(&dates(3), &[1.0, 1.0, 1.0]).unwrap();
        assert_eq!(m.volatility, 0.0);
        assert_eq!(m.sharpe, 0.0);
        assert_eq!(m.max_drawdown, 0.0);
        assert_eq!(m.cagr, 0.0);
    }

    #[test]
    fn test_volatility_and_sharpe() {
        // Daily returns +1%, -1%, +1%, -1%
        let navs = [1.0, 1.01, 0.9999, 1.009899, 0.99980001];
        let m = Metrics::compute(&dates(5), &navs).unwrap();
        let sd = (4.0_f64 / 3.0).sqrt() * 0.01;
        assert!((m.volatility - sd * 252f64.sqrt()).abs() < 1e-9);
        assert!(m.sharpe.abs() < 1e-9);
    }

    #[test]
    fn test_cagr_one_year() {
        let dates = [Date::from_ymd(2023, 1, 1), Date::from_ymd(2024, 1, 1)];
        let m = Metrics::compute(&dates, &[1.0, 1.1]).unwrap();
        // 365 days is slightly under 365.25
        assert!((m.cagr - (1.1_f64.powf(365.25 / 365.0) - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_empty_or_mismatched() {
        assert!(Metrics::compute(&[], &[]).is_none());
        assert!(Metrics::compute(&dates(2), &[1.0]).is_none());
    }
}
