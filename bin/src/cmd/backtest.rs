//! Single-factor backtest command implementation.

use super::{OutputFormat, num, pct, print_banner};
use crate::config::RunOptions;
use crate::data;
use anyhow::Result;
use factorlab_eval::{FactorBacktest, FactorReport};
use factorlab_traits::{InMemoryProvider, TracingObserver};
use std::path::Path;

/// Backtest one factor column of a CSV panel.
pub(crate) fn run_backtest(
    input: &Path,
    factor: &str,
    symbols: &[String],
    start: Option<&str>,
    end: Option<&str>,
    options: &RunOptions,
    format: OutputFormat,
) -> Result<()> {
    let config = options.resolve()?;
    let provider = InMemoryProvider::new(data::load_market_data(input)?);
    let request = data::build_request(&provider, symbols, start, end)?;

    tracing::info!(
        input = %input.display(),
        factor,
        start = %request.start,
        end = %request.end,
        "running single-factor backtest"
    );

    let observer = TracingObserver;
    let report = FactorBacktest::new(config.backtest)?
        .with_observer(&observer)
        .run_from_provider(&provider, &request, factor)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&report),
    }
    Ok(())
}

/// Prints the text summary of a single-factor report.
pub(super) fn print_report(report: &FactorReport) {
    print_banner(&format!("Factor Backtest: {}", report.factor));

    println!("Observations: {} rows over {} dates\n", report.n_rows, report.n_dates);

    println!("Information Coefficient");
    println!("{}", "-".repeat(60));
    println!("  {:20} {:>12} {:>12}", "", "IC", "Rank IC");
    let rank = &report.rank_ic.summary;
    println!("  {:20} {:>12} {:>12}", "Mean", num(report.ic_mean), num(rank.mean));
    println!("  {:20} {:>12} {:>12}", "Std", num(report.ic_std), num(rank.std));
    println!("  {:20} {:>12} {:>12}", "ICIR", num(report.icir), num(rank.icir));
    println!(
        "  {:20} {:>12} {:>12}",
        "Positive rate",
        pct(report.ic_positive_rate),
        pct(rank.positive_rate)
    );
    println!();

    let groups = report.group_returns();
    println!("Quantile Groups (mean period return)");
    println!("{}", "-".repeat(60));
    for group in 0..groups.n_groups() {
        let cells: Vec<f64> = groups.column(group).into_iter().flatten().collect();
        let mean = if cells.is_empty() {
            f64::NAN
        } else {
            cells.iter().sum::<f64>() / cells.len() as f64
        };
        println!("  Group {:<14} {:>12}", group + 1, pct(mean));
    }
    if report.groups.collapsed_dates > 0 {
        println!("  ({} dates had fewer distinct groups)", report.groups.collapsed_dates);
    }
    println!();

    let perf = &report.performance;
    println!("Long-Short Performance");
    println!("{}", "-".repeat(60));
    println!("  {:20} {:>12}", "Total return", pct(perf.total_return));
    println!("  {:20} {:>12}", "Annual return", pct(perf.annual_return));
    println!("  {:20} {:>12}", "Annual volatility", pct(perf.annual_volatility));
    println!("  {:20} {:>12}", "Sharpe ratio", num(perf.sharpe_ratio));
    println!("  {:20} {:>12}", "Sortino ratio", num(perf.sortino_ratio));
    println!("  {:20} {:>12}", "Calmar ratio", num(perf.calmar_ratio));
    println!("  {:20} {:>12}", "Max drawdown", pct(perf.max_drawdown));
    println!("  {:20} {:>12}", "Win rate", pct(perf.win_rate));
    println!("  {:20} {:>12}", "Profit/loss ratio", num(perf.profit_loss_ratio));
    println!("  {:20} {:>12}", "Mean turnover", pct(report.turnover));
    println!();
}
