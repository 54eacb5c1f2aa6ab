//! Heuristic factor weight optimization.
//!
//! Weights are derived from each factor's individual backtest. No
//! covariance model is involved.

use crate::weights::FactorWeights;
use factorlab_eval::FactorReport;
use factorlab_traits::{EngineEvent, EngineObserver, FactorLabError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// How weights are derived from individual factor results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationMethod {
    /// Weight proportional to |mean IC|.
    Ic,
    /// Weight proportional to max(0, Sharpe ratio).
    Sharpe,
    /// Accepted for compatibility; resolves to [`Self::Sharpe`].
    MeanVariance,
}

impl OptimizationMethod {
    /// Canonical name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ic => "ic",
            Self::Sharpe => "sharpe",
            Self::MeanVariance => "mean_variance",
        }
    }
}

impl fmt::Display for OptimizationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptimizationMethod {
    type Err = FactorLabError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ic" => Ok(Self::Ic),
            "sharpe" => Ok(Self::Sharpe),
            "mean_variance" | "mean-variance" => Ok(Self::MeanVariance),
            other => Err(FactorLabError::config(format!(
                "unknown optimization method '{other}', expected ic, sharpe or mean_variance"
            ))),
        }
    }
}

/// Derives normalized factor weights from individual backtest reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeightOptimizer {
    method: OptimizationMethod,
}

impl WeightOptimizer {
    /// Creates an optimizer for `method`.
    pub const fn new(method: OptimizationMethod) -> Self {
        Self { method }
    }

    /// The requested method.
    pub const fn method(&self) -> OptimizationMethod {
        self.method
    }

    /// Computes weights for every factor in `reports`.
    ///
    /// Falls back to equal weights when every score is zero. A non-finite
    /// IC or Sharpe counts as zero.
    ///
    /// # Errors
    ///
    /// Fails if `reports` is empty.
    pub fn optimize(
        &self,
        reports: &BTreeMap<String, FactorReport>,
        observer: &dyn EngineObserver,
    ) -> Result<FactorWeights> {
        if reports.is_empty() {
            return Err(FactorLabError::config(
                "weight optimization needs at least one factor result",
            ));
        }

        let method = match self.method {
            OptimizationMethod::MeanVariance => {
                observer.on_event(&EngineEvent::Warning {
                    message: "mean-variance optimization is not available, using sharpe weights",
                });
                OptimizationMethod::Sharpe
            }
            other => other,
        };

        let scores: Vec<(&str, f64)> = reports
            .iter()
            .map(|(name, report)| {
                let raw = match method {
                    OptimizationMethod::Ic => report.ic_mean.abs(),
                    _ => report.sharpe_ratio.max(0.0),
                };
                (name.as_str(), if raw.is_finite() { raw } else { 0.0 })
            })
            .collect();

        let weights = if scores.iter().all(|(_, s)| *s <= 0.0) {
            FactorWeights::equal(reports.keys().cloned())?
        } else {
            FactorWeights::normalize(scores)?
        };

        observer.on_event(&EngineEvent::WeightsOptimized {
            method: method.as_str(),
            weights: weights.as_map(),
        });

        Ok(weights)
    }
}
