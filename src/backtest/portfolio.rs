//! Equal-weight top-K portfolio simulation.
//!
//! On each rebalance day the portfolio is reset at the close to `1/k` of NAV
//! in each selected name. Between rebalances positions drift with their own
//! returns. Day `i` return over the held positions is
//!
//! ```text
//! r[i] = sum(w * close[i] / close[i-1]) / sum(w) - 1 - cost[i]
//! nav[i] = nav[i-1] * (1 + r[i]),  nav[first] = 1
//! ```
//!
//! where `cost[i] = turnover * bps / 10_000` on the day after a rebalance.

use std::collections::BTreeMap;

use serde::Serialize;

use super::data::{MarketData, PriceTable};
use super::error::BacktestError;
use super::momentum;
use super::schedule::Rebalance;
use super::universe::{Anomaly, Universe};
use crate::config::BacktestSection;
use crate::utils::date::Date;

/// Strategy parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub lookback: usize,
    pub top: usize,
    pub rebalance: Rebalance,
    pub start: Option<Date>,
    pub end: Option<Date>,
    pub capital: f64,
    pub cost_bps: f64,
}

impl From<&BacktestSection> for Strategy {
    fn from(section: &BacktestSection) -> Self {
        Self {
            lookback: section.lookback,
            top: section.top,
            rebalance: section.rebalance,
            start: section.start,
            end: section.end,
            capital: section.capital,
            cost_bps: section.cost_bps,
        }
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Self::from(&BacktestSection::default())
    }
}

/// One trading day of the simulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayRecord {
    pub date: Date,
    /// Net daily return
    #[serde(rename = "return")]
    pub ret: f64,
    pub nav: f64,
    pub equity: f64,
    /// Positions held after the close
    pub holdings: usize,
    pub constituents: usize,
    pub rebalanced: bool,
    pub turnover: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benchmark: Option<f64>,
}

/// Selection made at a rebalance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RebalanceRecord {
    pub date: Date,
    pub selected: Vec<String>,
    pub turnover: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Simulation {
    pub days: Vec<DayRecord>,
    pub rebalances: Vec<RebalanceRecord>,
    pub anomalies: Vec<Anomaly>,
}

impl Simulation {
    pub fn dates(&self) -> Vec<Date> {
        self.days.iter().map(|day| day.date).collect()
    }

    pub fn navs(&self) -> Vec<f64> {
        self.days.iter().map(|day| day.nav).collect()
    }

    /// Benchmark NAVs, if every analysis day has one.
    pub fn benchmark_navs(&self) -> Option<Vec<f64>> {
        self.days.iter().map(|day| day.benchmark).collect()
    }
}

/// Run the strategy over `data`.
pub fn simulate(data: &MarketData, strategy: &Strategy) -> Result<Simulation, BacktestError> {
    if strategy.lookback == 0 {
        return Err(BacktestError::NonPositive("lookback"));
    }
    if strategy.top == 0 {
        return Err(BacktestError::NonPositive("top"));
    }

    let prices = &data.prices;
    let (first, last) = window(prices, strategy)?;
    let dates = prices.dates();
    let universe = Universe::new(&data.snapshots, &data.membership)?;
    let mut cursor = universe.cursor(dates[first]);
    let benchmark = BenchmarkLevels::new(data.benchmark.as_deref(), dates[first]);

    let cost_rate = strategy.cost_bps / 10_000.0;
    let mut sim = Simulation::default();
    let mut weights: BTreeMap<String, f64> = BTreeMap::new();
    let mut nav = 1.0;
    let mut pending_cost = 0.0;

    for i in first..=last {
        let date = dates[i];
        let members = cursor.advance(date);

        let ret = if i == first {
            0.0
        } else {
            drift(prices, &mut weights, i) - std::mem::take(&mut pending_cost)
        };
        nav *= 1.0 + ret;

        let rebalanced = i == first || strategy.rebalance.is_new_period(dates[i - 1], date);
        let mut turnover = 0.0;
        if rebalanced {
            let ranked = momentum::rank(prices, members.iter().map(String::as_str), i, strategy.lookback);
            let selected = momentum::top_k(&ranked, strategy.top);
            let target = equal_weights(&selected);
            turnover = turnover_between(&weights, &target);
            pending_cost = turnover * cost_rate;
            crate::debug!("backtest"; "{date}: hold {} of {} eligible, turnover {turnover:.3}", selected.len(), ranked.len());

            sim.rebalances.push(RebalanceRecord {
                date,
                selected: selected.iter().map(|s| (*s).to_owned()).collect(),
                turnover,
            });
            weights = target;
        }

        sim.days.push(DayRecord {
            date,
            ret,
            nav,
            equity: strategy.capital * nav,
            holdings: weights.len(),
            constituents: members.len(),
            rebalanced,
            turnover,
            benchmark: benchmark.nav_on(date),
        });
    }

    sim.anomalies = cursor.into_anomalies();
    Ok(sim)
}

/// Indices of the first and last analysis days.
fn window(prices: &PriceTable, strategy: &Strategy) -> Result<(usize, usize), BacktestError> {
    let dates = prices.dates();
    let (Some(&data_first), Some(&data_last)) = (dates.first(), dates.last()) else {
        return Err(BacktestError::EmptyWindow {
            start: strategy.start.unwrap_or(Date::from_ymd(1970, 1, 1)),
            end: strategy.end.unwrap_or(Date::from_ymd(1970, 1, 1)),
        });
    };
    let start = strategy.start.unwrap_or(data_first);
    let end = strategy.end.unwrap_or(data_last);

    let first = prices.first_on_or_after(start);
    let first = match strategy.start {
        // An explicit start must already have a full lookback behind it
        Some(_) if first < strategy.lookback && first < dates.len() => {
            return Err(BacktestError::NotEnoughHistory {
                lookback: strategy.lookback,
                first: data_first,
                start: dates[first],
            });
        }
        Some(_) => first,
        None => first.max(strategy.lookback),
    };

    let end_count = prices.count_on_or_before(end);
    if first >= end_count {
        if strategy.start.is_none() && first >= dates.len() {
            return Err(BacktestError::NotEnoughHistory {
                lookback: strategy.lookback,
                first: data_first,
                start: data_last,
            });
        }
        return Err(BacktestError::EmptyWindow { start, end });
    }
    Ok((first, end_count - 1))
}

/// Let positions drift from day `i - 1` to day `i`. Returns the gross return.
fn drift(prices: &PriceTable, weights: &mut BTreeMap<String, f64>, i: usize) -> f64 {
    let before: f64 = weights.values().sum();
    if before <= 0.0 {
        return 0.0;
    }

    for (ticker, value) in weights.iter_mut() {
        let growth = match (prices.close(ticker, i - 1), prices.close(ticker, i)) {
            // Non-positive closes count as missing, as for momentum
            (Some(prev), Some(now)) if prev > 0.0 && now > 0.0 && now.is_finite() => now / prev,
            _ => 1.0,
        };
        *value *= growth;
    }

    let after: f64 = weights.values().sum();
    for value in weights.values_mut() {
        *value /= after;
    }
    after / before - 1.0
}

fn equal_weights(selected: &[&str]) -> BTreeMap<String, f64> {
    let weight = 1.0 / selected.len().max(1) as f64;
    selected.iter().map(|t| ((*t).to_owned(), weight)).collect()
}

/// Sum of absolute weight changes, counting cash as the remainder.
fn turnover_between(current: &BTreeMap<String, f64>, target: &BTreeMap<String, f64>) -> f64 {
    let changed: f64 = current
        .keys()
        .chain(target.keys().filter(|t| !current.contains_key(*t)))
        .map(|ticker| {
            let from = current.get(ticker).copied().unwrap_or(0.0);
            let to = target.get(ticker).copied().unwrap_or(0.0);
            (to - from).abs()
        })
        .sum();
    changed
}

/// Benchmark levels looked up as of each date, normalized to the first
/// analysis date.
struct BenchmarkLevels<'a> {
    series: &'a [(Date, f64)],
    base: Option<f64>,
}

impl<'a> BenchmarkLevels<'a> {
    fn new(series: Option<&'a [(Date, f64)]>, first: Date) -> Self {
        let series = series.unwrap_or_default();
        let mut levels = Self { series, base: None };
        levels.base = levels.level_on(first).filter(|level| *level > 0.0);
        levels
    }

    fn level_on(&self, date: Date) -> Option<f64> {
        let count = self.series.partition_point(|(d, _)| *d <= date);
        count.checked_sub(1).map(|i| self.series[i].1)
    }

    fn nav_on(&self, date: Date) -> Option<f64> {
        Some(self.level_on(date)? / self.base?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::data::{Action, MembershipEvent, Snapshots};
    use std::collections::BTreeSet;

    fn d(day: u8) -> Date {
        Date::from_ymd(2024, 1, day)
    }

    /// Trading days Jan 2..=12 2024 (weekdays).
    const DAYS: [u8; 9] = [2, 3, 4, 5, 8, 9, 10, 11, 12];

    fn data(series: &[(&str, [f64; 9])]) -> MarketData {
        let prices = PriceTable::from_long(series.iter().flat_map(|(ticker, closes)| {
            DAYS.iter()
                .zip(closes)
                .filter(|(_, c)| !c.is_nan())
                .map(|(day, c)| (d(*day), (*ticker).to_owned(), *c))
        }));
        let members: BTreeSet<String> = series.iter().map(|(t, _)| (*t).to_owned()).collect();
        MarketData {
            membership: Vec::new(),
            snapshots: Snapshots::from([(d(2), members)]),
            prices,
            benchmark: None,
        }
    }

    fn strategy(lookback: usize, top: usize, rebalance: Rebalance) -> Strategy {
        Strategy {
            lookback,
            top,
            rebalance,
            ..Strategy::default()
        }
    }

    fn sample() -> MarketData {
        data(&[
            ("AAA", [10.0, 10.5, 11.0, 10.8, 11.5, 11.2, 11.9, 12.4, 12.1]),
            ("BBB", [20.0, 19.0, 19.5, 20.5, 21.0, 22.5, 22.0, 21.5, 23.0]),
            ("CCC", [5.0, 5.1, 5.3, 5.2, 5.0, 4.8, 4.9, 5.4, 5.6]),
            ("DDD", [8.0, 8.0, 8.2, 8.4, 8.1, 8.6, 9.0, 8.8, 9.1]),
        ])
    }

    #[test]
    fn test_nav_is_running_product_from_one() {
        for rebalance in [Rebalance::Daily, Rebalance::Weekly, Rebalance::Monthly] {
            let mut strategy = strategy(2, 2, rebalance);
            strategy.cost_bps = 5.0;
            let sim = simulate(&sample(), &strategy).unwrap();

            assert_eq!(sim.days[0].nav, 1.0);
            assert_eq!(sim.days[0].date, d(4));
            let mut product = 1.0;
            for day in &sim.days {
                product *= 1.0 + day.ret;
                assert!((day.nav - product).abs() < 1e-12, "{rebalance} {}", day.date);
                assert!((day.equity - strategy.capital * day.nav).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_first_selection() {
        let sim = simulate(&sample(), &strategy(2, 2, Rebalance::Monthly)).unwrap();
        // Ratios on Jan 4 over two days: AAA 1.1, BBB 0.975, CCC 1.06, DDD 1.025
        assert_eq!(sim.rebalances.len(), 1);
        assert_eq!(sim.rebalances[0].selected, ["AAA", "CCC"]);
        assert_eq!(sim.rebalances[0].turnover, 1.0);

        // Jan 5 return: equal weights of AAA and CCC
        let expected = 0.5 * (10.8 / 11.0) + 0.5 * (5.2 / 5.3) - 1.0;
        assert!((sim.days[1].ret - expected).abs() < 1e-12);
    }

    #[test]
    fn test_drift_between_rebalances() {
        let sim = simulate(&sample(), &strategy(2, 2, Rebalance::Monthly)).unwrap();
        // Held AAA and CCC all along: value is the average of their growth.
        let growth = |start: f64, end: f64| end / start;
        let expected = 0.5 * growth(11.0, 12.1) + 0.5 * growth(5.3, 5.6);
        let last = sim.days.last().unwrap();
        assert!((last.nav - expected).abs() < 1e-12);
        assert!(sim.days[1..].iter().all(|day| !day.rebalanced));
    }

    #[test]
    fn test_weekly_rebalances_on_new_week() {
        let sim = simulate(&sample(), &strategy(2, 2, Rebalance::Weekly)).unwrap();
        let dates: Vec<_> = sim.rebalances.iter().map(|r| r.date).collect();
        assert_eq!(dates, [d(4), d(8)]);
    }

    #[test]
    fn test_costs_charged_day_after_rebalance() {
        let free = simulate(&sample(), &strategy(2, 2, Rebalance::Monthly)).unwrap();
        let mut costly = strategy(2, 2, Rebalance::Monthly);
        costly.cost_bps = 10.0;
        let paid = simulate(&sample(), &costly).unwrap();

        assert_eq!(paid.days[0].ret, 0.0);
        assert!((free.days[1].ret - paid.days[1].ret - 0.001).abs() < 1e-12);
        assert_eq!(free.days[2].ret, paid.days[2].ret);
    }

    #[test]
    fn test_fewer_eligible_than_top_and_cash() {
        let nan = f64::NAN;
        let market = data(&[
            ("AAA", [10.0, 10.0, 11.0, 12.0, 12.0, 12.0, 12.0, 12.0, 12.0]),
            ("BBB", [nan, nan, nan, 5.0, 5.0, 5.0, 5.0, 5.0, 5.0]),
        ]);
        let sim = simulate(&market, &strategy(2, 5, Rebalance::Daily)).unwrap();
        assert_eq!(sim.rebalances[0].selected, ["AAA"]);
        assert_eq!(sim.days[0].holdings, 1);

        // A zero close leaves the ratio undefined, so nothing is eligible
        let none = data(&[("AAA", [1.0, 1.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0])]);
        let sim = simulate(&none, &strategy(2, 5, Rebalance::Monthly)).unwrap();
        assert!(sim.rebalances[0].selected.is_empty());
        assert!(sim.days.iter().all(|day| day.nav == 1.0));
    }

    #[test]
    fn test_zero_close_held_as_missing() {
        let market = data(&[("AAA", [10.0, 11.0, 12.0, 0.0, 5.0, 6.0, 6.0, 6.0, 6.0])]);
        let sim = simulate(&market, &strategy(2, 1, Rebalance::Monthly)).unwrap();
        assert_eq!(sim.rebalances[0].selected, ["AAA"]);

        // Neither the day onto nor the day off the zero moves NAV
        assert_eq!(sim.days[1].ret, 0.0);
        assert_eq!(sim.days[2].ret, 0.0);
        assert!((sim.days[3].ret - 0.2).abs() < 1e-12);
        assert!(sim.days.iter().all(|day| day.nav.is_finite()));
        assert!((sim.days.last().unwrap().nav - 1.2).abs() < 1e-12);
    }

    #[test]
    fn test_membership_limits_selection() {
        let mut market = sample();
        market
            .membership
            .push(MembershipEvent::new(d(8), "AAA", Action::Removed));
        market.snapshots = Snapshots::from([(
            d(12),
            ["BBB", "CCC", "DDD"].iter().map(|t| (*t).to_owned()).collect(),
        )]);

        let sim = simulate(&market, &strategy(2, 1, Rebalance::Daily)).unwrap();
        let on = |day: u8| sim.rebalances.iter().find(|r| r.date == d(day)).unwrap();
        assert_eq!(on(4).selected, ["AAA"]);
        assert!(!on(8).selected.contains(&"AAA".to_owned()));
        assert_eq!(sim.days[0].constituents, 4);
        assert_eq!(sim.days[2].date, d(8));
        assert_eq!(sim.days[2].constituents, 3);
    }

    #[test]
    fn test_window_errors() {
        let market = sample();
        let mut early = strategy(3, 2, Rebalance::Daily);
        early.start = Some(d(3));
        assert!(matches!(
            simulate(&market, &early),
            Err(BacktestError::NotEnoughHistory { lookback: 3, .. })
        ));

        let mut empty = strategy(2, 2, Rebalance::Daily);
        empty.start = Some(d(10));
        empty.end = Some(d(9));
        assert!(matches!(
            simulate(&market, &empty),
            Err(BacktestError::EmptyWindow { .. })
        ));

        assert!(matches!(
            simulate(&market, &strategy(20, 2, Rebalance::Daily)),
            Err(BacktestError::NotEnoughHistory { .. })
        ));
    }

    #[test]
    fn test_benchmark_normalized_to_first_day() {
        let mut market = sample();
        market.benchmark = Some(vec![(d(2), 100.0), (d(4), 110.0), (d(8), 121.0)]);
        let sim = simulate(&market, &strategy(2, 2, Rebalance::Daily)).unwrap();
        assert_eq!(sim.days[0].benchmark, Some(1.0));
        // Jan 5 carries Jan 4's level forward
        assert_eq!(sim.days[1].benchmark, Some(1.0));
        assert_eq!(sim.days[2].benchmark, Some(1.1));
        assert!(sim.benchmark_navs().is_some());
    }
}
