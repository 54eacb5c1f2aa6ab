//! Multi-factor backtest command implementation.

use super::{OutputFormat, num, pct, print_banner};
use crate::config::RunOptions;
use crate::data;
use anyhow::{Context, Result, bail};
use factorlab_combine::{MultiFactorBacktest, MultiFactorReport, OptimizationMethod};
use factorlab_traits::{InMemoryProvider, TracingObserver};
use std::collections::BTreeMap;
use std::path::Path;

/// Backtest several factor columns and their weighted composite.
#[allow(clippy::too_many_arguments)]
pub(crate) fn run_multi(
    input: &Path,
    factors: &[String],
    weights: &[String],
    optimize: Option<&str>,
    symbols: &[String],
    start: Option<&str>,
    end: Option<&str>,
    options: &RunOptions,
    format: OutputFormat,
) -> Result<()> {
    if factors.is_empty() {
        bail!("no factors given, use --factors a,b,...");
    }

    let mut config = options.resolve()?;
    if !weights.is_empty() {
        config.weights = Some(parse_weights(weights)?);
    }
    if let Some(method) = optimize {
        config.optimize = Some(method.parse::<OptimizationMethod>()?);
    }

    let provider = InMemoryProvider::new(data::load_market_data(input)?);
    let request = data::build_request(&provider, symbols, start, end)?;
    let fields: Vec<&str> = factors.iter().map(String::as_str).collect();

    tracing::info!(
        input = %input.display(),
        factors = ?fields,
        start = %request.start,
        end = %request.end,
        "running multi-factor backtest"
    );

    let observer = TracingObserver;
    let report = MultiFactorBacktest::new(config)?
        .with_observer(&observer)
        .run_from_provider(&provider, &request, &fields)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_comparison(&report),
    }
    Ok(())
}

/// Parses `name=weight` pairs.
fn parse_weights(pairs: &[String]) -> Result<BTreeMap<String, f64>> {
    pairs
        .iter()
        .map(|pair| {
            let (name, weight) = pair
                .split_once('=')
                .with_context(|| format!("weight '{pair}' is not of the form name=value"))?;
            let weight: f64 = weight
                .trim()
                .parse()
                .with_context(|| format!("weight '{pair}' has a non-numeric value"))?;
            Ok((name.trim().to_string(), weight))
        })
        .collect()
}

fn print_comparison(report: &MultiFactorReport) {
    print_banner("Multi-Factor Backtest");

    println!("Weights");
    println!("{}", "-".repeat(60));
    for (name, weight) in report.weights.iter() {
        println!("  {name:25} {:>10}", pct(weight));
    }
    println!();

    println!("Comparison");
    println!("{}", "-".repeat(86));
    println!(
        "  {:20} {:>10} {:>10} {:>14} {:>12} {:>12}",
        "Factor", "IC Mean", "ICIR", "Annual Return", "Sharpe", "Max DD"
    );
    for row in &report.comparison {
        println!(
            "  {:20} {:>10} {:>10} {:>14} {:>12} {:>12}",
            row.factor,
            num(row.ic_mean),
            num(row.icir),
            pct(row.annual_return),
            num(row.sharpe_ratio),
            pct(row.max_drawdown)
        );
    }
    println!();

    super::backtest::print_report(&report.composite);
}
