//! Information Coefficient (IC) calculations.
//!
//! IC is the cross-sectional correlation between factor values and forward
//! returns on one date. Pearson measures linear association; Spearman (rank
//! IC) correlates the ranks and is robust to monotonic transformations.

use crate::panel::AlignedPanel;
use factorlab_traits::stats::{is_degenerate_std, mean, sample_std};
use factorlab_traits::{FactorLabError, Result, TimeSeries};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Correlation used for the IC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationMethod {
    /// Linear correlation of the raw values.
    #[default]
    Pearson,
    /// Linear correlation of the average ranks.
    Spearman,
}

impl CorrelationMethod {
    /// Lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pearson => "pearson",
            Self::Spearman => "spearman",
        }
    }

    /// Correlation of two equally long, finite slices.
    pub fn correlate(self, x: &[f64], y: &[f64]) -> f64 {
        match self {
            Self::Pearson => pearson_correlation(x, y),
            Self::Spearman => spearman_correlation(x, y),
        }
    }
}

impl fmt::Display for CorrelationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CorrelationMethod {
    type Err = FactorLabError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pearson" => Ok(Self::Pearson),
            "spearman" | "rank" => Ok(Self::Spearman),
            other => Err(FactorLabError::config(format!(
                "unknown correlation method '{other}', expected 'pearson' or 'spearman'"
            ))),
        }
    }
}

/// Calculate the IC between factor scores and forward returns.
///
/// Pairs where either side is non-finite are dropped first. Returns NaN when
/// fewer than two pairs remain or either side has zero variance.
///
/// # Example
///
/// ```
/// use factorlab_eval::{calculate_ic, CorrelationMethod};
/// use ndarray::array;
///
/// let scores = array![1.0, 2.0, 3.0, 4.0];
/// let returns = array![0.01, 0.02, -0.01, 0.05];
/// let ic = calculate_ic(&scores, &returns, CorrelationMethod::Pearson);
/// assert!((ic - 0.4648).abs() < 1e-4);
/// ```
pub fn calculate_ic(
    factor_scores: &Array1<f64>,
    forward_returns: &Array1<f64>,
    method: CorrelationMethod,
) -> f64 {
    if factor_scores.len() != forward_returns.len() {
        return f64::NAN;
    }

    let (x, y): (Vec<f64>, Vec<f64>) = factor_scores
        .iter()
        .zip(forward_returns.iter())
        .filter(|(s, r)| s.is_finite() && r.is_finite())
        .map(|(&s, &r)| (s, r))
        .unzip();

    method.correlate(&x, &y)
}

/// Pearson correlation, clamped to `[-1, 1]`.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return f64::NAN;
    }

    let mean_x = x[..n].iter().sum::<f64>() / n as f64;
    let mean_y = y[..n].iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;

    for (xi, yi) in x[..n].iter().zip(&y[..n]) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let dof = (n - 1) as f64;
    let flat_x = is_degenerate_std((var_x / dof).sqrt(), mean_x);
    let flat_y = is_degenerate_std((var_y / dof).sqrt(), mean_y);
    if flat_x || flat_y {
        return f64::NAN;
    }

    (cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0)
}

/// Spearman rank correlation with average ranks for ties.
pub fn spearman_correlation(x: &[f64], y: &[f64]) -> f64 {
    pearson_correlation(&average_ranks(x), &average_ranks(y))
}

/// Zero-based ranks, ties sharing their average rank.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut indexed: Vec<(usize, f64)> = values.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut ranks = vec![0.0; n];
    let mut i = 0;

    while i < n {
        let mut j = i;
        while j < n && indexed[j].1 == indexed[i].1 {
            j += 1;
        }

        let avg_rank = (i + j - 1) as f64 / 2.0;
        for &(original, _) in &indexed[i..j] {
            ranks[original] = avg_rank;
        }

        i = j;
    }

    ranks
}

/// Aggregate statistics of an IC series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IcSummary {
    /// Mean of the defined IC values.
    pub mean: f64,
    /// Sample standard deviation of the defined IC values.
    pub std: f64,
    /// `mean / std`, 0 when the std is zero or undefined.
    pub icir: f64,
    /// Fraction of defined IC values above zero.
    pub positive_rate: f64,
    /// Number of defined IC values.
    pub n_periods: usize,
}

impl IcSummary {
    /// Summarises an IC series, skipping NaN entries.
    ///
    /// An empty or all-NaN series gives NaN statistics.
    pub fn from_values(values: &[f64]) -> Self {
        let valid: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let n_periods = valid.len();

        if n_periods == 0 {
            return Self {
                mean: f64::NAN,
                std: f64::NAN,
                icir: f64::NAN,
                positive_rate: f64::NAN,
                n_periods,
            };
        }

        let mean = mean(&valid);
        let std = sample_std(&valid);
        let icir = if is_degenerate_std(std, mean) { 0.0 } else { mean / std };
        let positive = valid.iter().filter(|&&ic| ic > 0.0).count();

        Self {
            mean,
            std,
            icir,
            positive_rate: positive as f64 / n_periods as f64,
            n_periods,
        }
    }
}

/// IC series for one correlation method plus derived views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IcAnalysis {
    /// Correlation method used.
    pub method: CorrelationMethod,
    /// IC per date, NaN where undefined.
    pub series: TimeSeries,
    /// Running sum of the IC. Undefined dates repeat the previous value.
    pub cumulative: TimeSeries,
    /// Summary statistics.
    pub summary: IcSummary,
}

/// Computes the IC of every date in the panel.
///
/// Dates with fewer than two instruments or constant values get NaN and are
/// excluded from the summary. The result is deterministic.
pub fn compute_ic(panel: &AlignedPanel, method: CorrelationMethod) -> IcAnalysis {
    let mut series = TimeSeries::new(format!("ic_{method}"));
    let mut cumulative = TimeSeries::new(format!("cumulative_ic_{method}"));
    let mut running = 0.0;

    for (date, rows) in panel.cross_sections() {
        let factor: Array1<f64> = rows.iter().map(|r| r.factor).collect();
        let returns: Array1<f64> = rows.iter().map(|r| r.forward_return).collect();
        let ic = calculate_ic(&factor, &returns, method);

        if ic.is_finite() {
            running += ic;
        }
        series.push(date, ic);
        cumulative.push(date, running);
    }

    let summary = IcSummary::from_values(series.values());

    IcAnalysis {
        method,
        series,
        cumulative,
        summary,
    }
}
