//! `folio backtest`: replay index membership and run the momentum strategy.

use anyhow::{Context, Result, bail};
use owo_colors::Style;

use crate::backtest::{MarketData, Metrics, Strategy, Summary, Universe, export, simulate};
use crate::cli::BacktestArgs;
use crate::config::FolioConfig;
use crate::logger::{epaint, paint};
use crate::utils::{plural_count, plural_s};
use crate::{debug, log};

pub fn run_backtest(args: &BacktestArgs, config: &FolioConfig) -> Result<()> {
    let section = &config.backtest;
    log!("backtest"; "loading data from {}", section.data.display());
    let data = MarketData::load(section)?;
    log!(
        "backtest";
        "{} over {}, {}, {}",
        plural_count(data.prices.tickers().count(), "ticker"),
        plural_count(data.prices.dates().len(), "trading day"),
        plural_count(data.membership.len(), "membership event"),
        plural_count(data.snapshots.len(), "snapshot")
    );

    if args.verify {
        return verify_snapshots(&data);
    }

    let strategy = Strategy::from(section);
    debug!("backtest"; "{:?}", strategy);
    let sim = simulate(&data, &strategy)?;

    if !sim.anomalies.is_empty() {
        log!(
            "warning";
            "{} contradict the replayed membership",
            plural_count(sim.anomalies.len(), "membership event")
        );
        for anomaly in &sim.anomalies {
            debug!("backtest"; "{}", anomaly);
        }
    }

    let summary = Summary::from_simulation(&sim).context("no trading days were simulated")?;
    print_summary(&summary, &strategy);

    if let Some(output) = &args.output {
        export::write(output, &sim.days, &sim.rebalances, Some(&summary))?;
        log!("backtest"; "wrote {} to {}", plural_count(sim.days.len(), "day"), output.display());
    }
    Ok(())
}

/// Compare each recorded snapshot with its reconstruction from the anchor.
fn verify_snapshots(data: &MarketData) -> Result<()> {
    let universe = Universe::new(&data.snapshots, &data.membership)?;
    log!(
        "backtest";
        "anchor snapshot {} with {}",
        universe.anchor_date(),
        plural_count(data.snapshots.get(&universe.anchor_date()).map_or(0, |s| s.len()), "member")
    );

    let checks = universe.verify(&data.snapshots);
    let mut failed = 0;
    for check in &checks {
        if check.is_match() {
            log!("backtest"; "{} {} ({})", check.date, paint("ok", Style::new().green()), plural_count(check.recorded, "member"));
            continue;
        }
        failed += 1;
        log!("error"; "{} reconstruction differs from the recorded snapshot", check.date);
        if !check.missing.is_empty() {
            eprintln!("  {} {}", epaint("missing", Style::new().red()), check.missing.join(", "));
        }
        if !check.unexpected.is_empty() {
            eprintln!("  {} {}", epaint("unexpected", Style::new().red()), check.unexpected.join(", "));
        }
    }

    if failed > 0 {
        bail!(
            "{} of {} snapshot{} do not match the membership replay",
            failed,
            checks.len(),
            plural_s(checks.len())
        );
    }
    log!("backtest"; "all {} reproduced", plural_count(checks.len(), "snapshot"));
    Ok(())
}

fn print_summary(summary: &Summary, strategy: &Strategy) {
    println!(
        "{} {} to {} ({}), top {} by {}-day momentum, {} rebalance",
        paint("period", Style::new().dimmed()),
        summary.start,
        summary.end,
        plural_count(summary.days, "day"),
        strategy.top,
        strategy.lookback,
        strategy.rebalance
    );
    println!(
        "{} {:.4} (equity {:.2})",
        paint("final nav", Style::new().dimmed()),
        summary.final_nav,
        summary.final_equity
    );
    print_metrics("portfolio", &summary.portfolio);
    if let Some(benchmark) = &summary.benchmark {
        print_metrics("benchmark", benchmark);
    }
    println!(
        "{} {} (mean turnover {:.1}%)",
        paint("rebalances", Style::new().dimmed()),
        summary.rebalances,
        summary.mean_turnover * 100.0
    );
}

fn print_metrics(name: &str, m: &Metrics) {
    println!(
        "{} return {:.2}%, cagr {:.2}%, vol {:.2}%, sharpe {:.2}, max drawdown {:.2}% ({} to {})",
        paint(format_args!("{name:<10}"), Style::new().bold()),
        m.total_return * 100.0,
        m.cagr * 100.0,
        m.volatility * 100.0,
        m.sharpe,
        m.max_drawdown * 100.0,
        m.drawdown_peak,
        m.drawdown_trough
    );
}
