//! Performance metrics for periodic return series.
//!
//! All functions are pure and never fail. Ratios whose denominator vanishes
//! return 0 instead of dividing by zero. Non-finite returns are skipped by the
//! moment estimators and contribute nothing when compounding.

use factorlab_traits::stats::{is_degenerate_std, mean, sample_std};
use factorlab_traits::{FactorLabError, Result, Symbol};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Default annual risk-free rate.
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.03;

/// Default number of return periods per year (trading days).
pub const DEFAULT_PERIODS_PER_YEAR: usize = 252;

/// Configuration for metrics calculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Annual risk-free rate used by Sharpe and Sortino.
    pub risk_free_rate: f64,
    /// Number of return periods per year for annualization.
    pub periods_per_year: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
            periods_per_year: DEFAULT_PERIODS_PER_YEAR,
        }
    }
}

impl MetricsConfig {
    /// Rejects a zero annualization factor and a non-finite risk-free rate.
    pub fn validate(&self) -> Result<()> {
        if self.periods_per_year == 0 {
            return Err(FactorLabError::config("periods_per_year must be positive"));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(FactorLabError::config(format!(
                "risk_free_rate must be finite, got {}",
                self.risk_free_rate
            )));
        }
        Ok(())
    }

    /// Risk-free rate per period.
    pub fn periodic_risk_free(&self) -> f64 {
        self.risk_free_rate / self.periods_per_year as f64
    }
}

fn finite(returns: &[f64]) -> Vec<f64> {
    returns.iter().copied().filter(|r| r.is_finite()).collect()
}

/// Running product of `1 + r`. Non-finite returns count as zero.
///
/// The curve starts implicitly at 1 before the first observation, so the
/// first element is `1 + r[0]`.
pub fn cumulative_returns(returns: &[f64]) -> Vec<f64> {
    returns
        .iter()
        .scan(1.0, |wealth, &r| {
            if r.is_finite() {
                *wealth *= 1.0 + r;
            }
            Some(*wealth)
        })
        .collect()
}

/// Compounded return over the whole series, 0 when empty.
pub fn total_return(returns: &[f64]) -> f64 {
    cumulative_returns(returns).last().map_or(0.0, |w| w - 1.0)
}

/// `prod(1 + r) ^ (periods_per_year / n) - 1`, NaN for an empty series.
pub fn annualized_return(returns: &[f64], periods_per_year: usize) -> f64 {
    let r = finite(returns);
    if r.is_empty() {
        return f64::NAN;
    }

    let growth: f64 = r.iter().map(|x| 1.0 + x).product();
    growth.powf(periods_per_year as f64 / r.len() as f64) - 1.0
}

/// Sample standard deviation scaled by `sqrt(periods_per_year)`.
pub fn annualized_volatility(returns: &[f64], periods_per_year: usize) -> f64 {
    sample_std(returns) * (periods_per_year as f64).sqrt()
}

/// `mean(r - rf / ppy) / std(r) * sqrt(ppy)`, 0 when the std is zero or undefined.
pub fn sharpe_ratio(returns: &[f64], config: &MetricsConfig) -> f64 {
    let r = finite(returns);
    let std = sample_std(&r);
    let avg = mean(&r);
    if is_degenerate_std(std, avg) {
        return 0.0;
    }

    (avg - config.periodic_risk_free()) / std * (config.periods_per_year as f64).sqrt()
}

/// Largest peak-to-trough decline of a cumulative curve, as a positive fraction.
///
/// The running peak starts at the first point of the curve. Returns 0 for an
/// empty or monotonically rising curve.
pub fn max_drawdown(cumulative: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst: f64 = 0.0;

    for &value in cumulative.iter().filter(|v| v.is_finite()) {
        peak = peak.max(value);
        if peak > 0.0 {
            worst = worst.min((value - peak) / peak);
        }
    }

    worst.abs()
}

/// [`max_drawdown`] of the curve compounded from `returns`.
pub fn max_drawdown_from_returns(returns: &[f64]) -> f64 {
    max_drawdown(&cumulative_returns(returns))
}

/// Annualized return over max drawdown, 0 without drawdown.
pub fn calmar_ratio(returns: &[f64], periods_per_year: usize) -> f64 {
    let mdd = max_drawdown_from_returns(returns);
    if mdd == 0.0 {
        0.0
    } else {
        annualized_return(returns, periods_per_year) / mdd
    }
}

/// Annualized excess return over annualized downside deviation.
///
/// The downside deviation is the sample std of the negative returns only.
/// Returns 0 when there are no losing periods or their std is zero or undefined.
pub fn sortino_ratio(returns: &[f64], config: &MetricsConfig) -> f64 {
    let r = finite(returns);
    let downside: Vec<f64> = r.iter().copied().filter(|&x| x < 0.0).collect();
    let ppy = config.periods_per_year as f64;
    let downside_std = sample_std(&downside);

    if downside.is_empty() || is_degenerate_std(downside_std, mean(&downside)) {
        return 0.0;
    }

    (mean(&r) - config.periodic_risk_free()) * ppy / (downside_std * ppy.sqrt())
}

/// Fraction of periods with a positive return, 0 for an empty series.
pub fn win_rate(returns: &[f64]) -> f64 {
    let r = finite(returns);
    if r.is_empty() {
        return 0.0;
    }
    r.iter().filter(|&&x| x > 0.0).count() as f64 / r.len() as f64
}

/// Average gain over average absolute loss, 0 without losing periods.
pub fn profit_loss_ratio(returns: &[f64]) -> f64 {
    let r = finite(returns);
    let gains: Vec<f64> = r.iter().copied().filter(|&x| x > 0.0).collect();
    let losses: Vec<f64> = r.iter().copied().filter(|&x| x < 0.0).collect();

    if losses.is_empty() {
        return 0.0;
    }

    let avg_gain = if gains.is_empty() { 0.0 } else { mean(&gains) };
    let avg_loss = mean(&losses).abs();
    if avg_loss == 0.0 { 0.0 } else { avg_gain / avg_loss }
}

/// Annualized active return over tracking error.
///
/// The two series are paired by position; the longer one is truncated.
/// Returns 0 when the tracking error is zero or undefined.
pub fn information_ratio(returns: &[f64], benchmark: &[f64], periods_per_year: usize) -> f64 {
    let excess: Vec<f64> = returns
        .iter()
        .zip(benchmark)
        .map(|(r, b)| r - b)
        .filter(|x| x.is_finite())
        .collect();

    let ppy = periods_per_year as f64;
    let active = mean(&excess);
    let tracking_error = sample_std(&excess);
    if is_degenerate_std(tracking_error, active) {
        return 0.0;
    }

    active * ppy / (tracking_error * ppy.sqrt())
}

/// Per-period turnover of a dense weight matrix (periods × positions).
///
/// Turnover is half the summed absolute weight change since the previous
/// period. The first period has turnover 0. Non-finite weights count as 0.
pub fn turnover(weights: &[Vec<f64>]) -> Vec<f64> {
    let clean = |w: f64| if w.is_finite() { w } else { 0.0 };

    let mut result = Vec::with_capacity(weights.len());
    for (i, row) in weights.iter().enumerate() {
        if i == 0 {
            result.push(0.0);
            continue;
        }
        let prev = &weights[i - 1];
        let width = row.len().max(prev.len());
        let traded: f64 = (0..width)
            .map(|j| {
                let now = row.get(j).copied().map_or(0.0, clean);
                let before = prev.get(j).copied().map_or(0.0, clean);
                (now - before).abs()
            })
            .sum();
        result.push(traded / 2.0);
    }
    result
}

/// [`turnover`] for books keyed by instrument. Absent instruments weigh 0.
pub fn position_turnover(books: &[BTreeMap<Symbol, f64>]) -> Vec<f64> {
    let mut result = Vec::with_capacity(books.len());
    let mut previous: Option<&BTreeMap<Symbol, f64>> = None;

    for book in books {
        let traded = match previous {
            None => 0.0,
            Some(prev) => {
                let symbols: BTreeSet<&Symbol> = book.keys().chain(prev.keys()).collect();
                symbols
                    .into_iter()
                    .map(|s| {
                        let now = book.get(s).copied().unwrap_or(0.0);
                        let before = prev.get(s).copied().unwrap_or(0.0);
                        (now - before).abs()
                    })
                    .sum::<f64>()
                    / 2.0
            }
        };
        result.push(traded);
        previous = Some(book);
    }

    result
}

/// Summary of a return series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    /// Compounded return over the whole period.
    pub total_return: f64,
    /// Annualized compounded return.
    pub annual_return: f64,
    /// Annualized volatility.
    pub annual_volatility: f64,
    /// Sharpe ratio.
    pub sharpe_ratio: f64,
    /// Maximum drawdown as a positive fraction.
    pub max_drawdown: f64,
    /// Calmar ratio.
    pub calmar_ratio: f64,
    /// Sortino ratio.
    pub sortino_ratio: f64,
    /// Fraction of positive periods.
    pub win_rate: f64,
    /// Average gain over average loss.
    pub profit_loss_ratio: f64,
    /// Number of return periods.
    pub n_periods: usize,
}

impl PerformanceReport {
    /// Computes every metric of `returns`.
    pub fn from_returns(returns: &[f64], config: &MetricsConfig) -> Self {
        let ppy = config.periods_per_year;
        Self {
            total_return: total_return(returns),
            annual_return: annualized_return(returns, ppy),
            annual_volatility: annualized_volatility(returns, ppy),
            sharpe_ratio: sharpe_ratio(returns, config),
            max_drawdown: max_drawdown_from_returns(returns),
            calmar_ratio: calmar_ratio(returns, ppy),
            sortino_ratio: sortino_ratio(returns, config),
            win_rate: win_rate(returns),
            profit_loss_ratio: profit_loss_ratio(returns),
            n_periods: returns.len(),
        }
    }

    /// Metrics by name.
    pub fn to_map(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([
            ("total_return", self.total_return),
            ("annual_return", self.annual_return),
            ("annual_volatility", self.annual_volatility),
            ("sharpe_ratio", self.sharpe_ratio),
            ("max_drawdown", self.max_drawdown),
            ("calmar_ratio", self.calmar_ratio),
            ("sortino_ratio", self.sortino_ratio),
            ("win_rate", self.win_rate),
            ("profit_loss_ratio", self.profit_loss_ratio),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_metrics_config_default() {
        let config = MetricsConfig::default();
        assert_eq!(config.periods_per_year, 252);
        assert_abs_diff_eq!(config.risk_free_rate, 0.03);
        assert!(config.validate().is_ok());

        let bad = MetricsConfig {
            periods_per_year: 0,
            ..Default::default()
        };
        assert!(bad.validate().unwrap_err().is_configuration());
    }

    #[test]
    fn test_cumulative_returns() {
        let curve = cumulative_returns(&[0.02, -0.01]);
        assert_abs_diff_eq!(curve[0], 1.02, epsilon = 1e-12);
        assert_abs_diff_eq!(curve[1], 1.0098, epsilon = 1e-12);

        let with_nan = cumulative_returns(&[0.1, f64::NAN, 0.1]);
        assert_abs_diff_eq!(with_nan[1], 1.1, epsilon = 1e-12);
        assert_abs_diff_eq!(with_nan[2], 1.21, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_returns_idempotent() {
        let zeros = vec![0.0; 10];
        assert!(cumulative_returns(&zeros).iter().all(|&w| w == 1.0));
        assert_eq!(max_drawdown_from_returns(&zeros), 0.0);
        assert_eq!(total_return(&zeros), 0.0);
    }

    #[test]
    fn test_sharpe_zero_std_is_zero() {
        let config = MetricsConfig::default();
        assert_eq!(sharpe_ratio(&[0.0, 0.0, 0.0], &config), 0.0);
        assert_eq!(sharpe_ratio(&[0.01], &config), 0.0);
        assert_eq!(sharpe_ratio(&[], &config), 0.0);
    }

    #[test]
    fn test_ratios_on_constant_nonzero_returns() {
        let config = MetricsConfig::default();
        let flat = [0.1, 0.1, 0.1];
        assert_eq!(sharpe_ratio(&flat, &config), 0.0);
        assert_eq!(sharpe_ratio(&[0.1 + 0.2, 0.3, 0.3], &config), 0.0);

        assert_eq!(sortino_ratio(&[0.02, -0.01, -0.01, -0.01], &config), 0.0);
        assert_eq!(sortino_ratio(&[0.1, 0.1, 0.1], &config), 0.0);

        assert_eq!(information_ratio(&flat, &[0.05, 0.05, 0.05], 252), 0.0);
        assert_eq!(information_ratio(&[0.3, 0.2, 0.4], &[0.2, 0.1, 0.3], 252), 0.0);
    }

    #[test]
    fn test_sharpe_ratio() {
        let config = MetricsConfig::default();
        let returns = [0.01, -0.005, 0.015, 0.002, -0.003];
        let excess = mean(&returns) - 0.03 / 252.0;
        let expected = excess / sample_std(&returns) * 252f64.sqrt();
        assert_relative_eq!(sharpe_ratio(&returns, &config), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_annualized_return_and_volatility() {
        let returns = [0.01; 252];
        assert_relative_eq!(
            annualized_return(&returns, 252),
            1.01f64.powi(252) - 1.0,
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(annualized_volatility(&returns, 252), 0.0, epsilon = 1e-12);
        assert!(annualized_return(&[], 252).is_nan());
        assert!(annualized_volatility(&[0.01], 252).is_nan());
    }

    #[test]
    fn test_max_drawdown() {
        let curve = [1.0, 1.1, 1.15, 1.05, 1.08, 1.2];
        assert_abs_diff_eq!(max_drawdown(&curve), (1.15 - 1.05) / 1.15, epsilon = 1e-12);
        assert_eq!(max_drawdown(&[]), 0.0);
        assert_eq!(max_drawdown(&[1.0, 1.1, 1.2]), 0.0);
    }

    #[test]
    fn test_max_drawdown_non_negative() {
        let series: Vec<f64> = (0..200).map(|i| ((i as f64) * 0.37).sin() * 0.05).collect();
        assert!(max_drawdown_from_returns(&series) >= 0.0);
        assert!(max_drawdown_from_returns(&series) < 1.0);
    }

    #[test]
    fn test_calmar_ratio() {
        assert_eq!(calmar_ratio(&[0.01, 0.02], 252), 0.0);
        let returns = [0.1, -0.1];
        let expected = annualized_return(&returns, 252) / 0.1;
        assert_relative_eq!(calmar_ratio(&returns, 252), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_sortino_ratio() {
        let config = MetricsConfig::default();
        assert_eq!(sortino_ratio(&[0.01, 0.02], &config), 0.0);
        assert_eq!(sortino_ratio(&[0.01, -0.02], &config), 0.0);

        let returns = [0.02, -0.01, 0.03, -0.03];
        let downside_std = sample_std(&[-0.01, -0.03]) * 252f64.sqrt();
        let expected = (mean(&returns) - 0.03 / 252.0) * 252.0 / downside_std;
        assert_relative_eq!(sortino_ratio(&returns, &config), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_win_rate_and_profit_loss() {
        let returns = [0.02, -0.01, 0.04, 0.0];
        assert_abs_diff_eq!(win_rate(&returns), 0.5);
        assert_abs_diff_eq!(profit_loss_ratio(&returns), 3.0, epsilon = 1e-12);
        assert_eq!(profit_loss_ratio(&[0.01, 0.02]), 0.0);
        assert_eq!(win_rate(&[]), 0.0);
    }

    #[test]
    fn test_information_ratio() {
        let strategy = [0.02, 0.01, 0.03, 0.00];
        let benchmark = [0.01, 0.01, 0.01, 0.01];
        let excess = [0.01, 0.0, 0.02, -0.01];
        let expected = mean(&excess) * 252.0 / (sample_std(&excess) * 252f64.sqrt());
        assert_relative_eq!(information_ratio(&strategy, &benchmark, 252), expected, epsilon = 1e-12);
        assert_eq!(information_ratio(&benchmark, &benchmark, 252), 0.0);
    }

    #[test]
    fn test_turnover() {
        let weights = vec![vec![0.5, 0.3, 0.2], vec![0.4, 0.4, 0.2], vec![0.4, 0.4, 0.2]];
        let result = turnover(&weights);
        assert_eq!(result.len(), 3);
        assert_eq!(result[0], 0.0);
        assert_abs_diff_eq!(result[1], 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(result[2], 0.0);
    }

    #[test]
    fn test_position_turnover_handles_entries_and_exits() {
        let books = vec![
            BTreeMap::from([("A".to_string(), 1.0)]),
            BTreeMap::from([("B".to_string(), 1.0)]),
        ];
        assert_eq!(position_turnover(&books), vec![0.0, 1.0]);
        assert!(position_turnover(&[]).is_empty());
    }

    #[test]
    fn test_performance_report() {
        let returns = [0.01, -0.02, 0.015, 0.005];
        let config = MetricsConfig::default();
        let report = PerformanceReport::from_returns(&returns, &config);

        assert_eq!(report.n_periods, 4);
        assert_abs_diff_eq!(report.total_return, total_return(&returns));
        assert_abs_diff_eq!(report.sharpe_ratio, sharpe_ratio(&returns, &config));
        assert_abs_diff_eq!(report.win_rate, 0.75);
        assert!(report.max_drawdown > 0.0);
        assert_eq!(report.to_map().len(), 9);
    }

    #[test]
    fn test_performance_report_empty() {
        let report = PerformanceReport::from_returns(&[], &MetricsConfig::default());
        assert_eq!(report.total_return, 0.0);
        assert!(report.annual_return.is_nan());
        assert_eq!(report.sharpe_ratio, 0.0);
        assert_eq!(report.max_drawdown, 0.0);
        assert_eq!(report.calmar_ratio, 0.0);
    }
}
