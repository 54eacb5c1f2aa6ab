//! Multi-factor backtest.
//!
//! Each factor is preprocessed and evaluated on its own, weights are taken
//! from the configuration or derived by a [`WeightOptimizer`], and the
//! weighted composite is evaluated with the same engine. The composite is
//! built from already preprocessed factors and is not preprocessed again.

use crate::composite::CompositeBuilder;
use crate::optimizer::{OptimizationMethod, WeightOptimizer};
use crate::weights::FactorWeights;
use factorlab_eval::{
    BacktestConfig, FactorBacktest, FactorReport, FactorSeries, PanelColumn, ReturnSeries,
    forward_returns,
};
use factorlab_traits::provider::CLOSE_FIELD;
use factorlab_traits::{DataProvider, DataRequest, EngineObserver, FactorLabError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Label of the composite row in the comparison table.
pub const COMPOSITE_LABEL: &str = "composite";

/// Multi-factor backtest configuration.
///
/// At most one of `weights` and `optimize` may be set. With neither, every
/// factor gets equal weight.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiFactorConfig {
    /// Settings shared by every single-factor run.
    pub backtest: BacktestConfig,
    /// Explicit raw weights, normalized before use.
    pub weights: Option<BTreeMap<String, f64>>,
    /// Derive weights from the individual results instead.
    pub optimize: Option<OptimizationMethod>,
}

impl MultiFactorConfig {
    /// Checks every field.
    pub fn validate(&self) -> Result<()> {
        self.backtest.validate()?;
        if self.weights.is_some() && self.optimize.is_some() {
            return Err(FactorLabError::config(
                "explicit weights and an optimization method are mutually exclusive",
            ));
        }
        if let Some(weights) = &self.weights {
            FactorWeights::normalize(weights.iter().map(|(k, v)| (k.as_str(), *v)))?;
        }
        Ok(())
    }
}

/// One line of the factor comparison table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    /// Factor name, or [`COMPOSITE_LABEL`].
    pub factor: String,
    /// Mean Pearson IC.
    pub ic_mean: f64,
    /// Pearson ICIR.
    pub icir: f64,
    /// Annualized long-short return.
    pub annual_return: f64,
    /// Long-short Sharpe ratio.
    pub sharpe_ratio: f64,
    /// Long-short maximum drawdown.
    pub max_drawdown: f64,
}

impl ComparisonRow {
    fn from_report(label: &str, report: &FactorReport) -> Self {
        Self {
            factor: label.to_string(),
            ic_mean: report.ic_mean,
            icir: report.icir,
            annual_return: report.annual_return,
            sharpe_ratio: report.sharpe_ratio,
            max_drawdown: report.max_drawdown,
        }
    }
}

/// Results of a multi-factor backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiFactorReport {
    /// Single-factor report per input factor.
    pub individual: BTreeMap<String, FactorReport>,
    /// Report of the weighted composite.
    pub composite: FactorReport,
    /// Normalized weights used for the composite.
    pub weights: FactorWeights,
    /// One row per factor followed by the composite row.
    pub comparison: Vec<ComparisonRow>,
}

impl MultiFactorReport {
    /// The comparison table as a frame.
    pub fn comparison_frame(&self) -> Result<DataFrame> {
        let column = |f: fn(&ComparisonRow) -> f64| -> Vec<f64> {
            self.comparison.iter().map(f).collect()
        };
        let factors: Vec<&str> = self.comparison.iter().map(|r| r.factor.as_str()).collect();

        Ok(df! {
            "factor" => factors,
            "ic_mean" => column(|r| r.ic_mean),
            "icir" => column(|r| r.icir),
            "annual_return" => column(|r| r.annual_return),
            "sharpe_ratio" => column(|r| r.sharpe_ratio),
            "max_drawdown" => column(|r| r.max_drawdown),
        }?)
    }
}

/// Multi-factor backtest runner.
#[derive(Clone)]
pub struct MultiFactorBacktest<'a> {
    config: MultiFactorConfig,
    backtest: FactorBacktest<'a>,
}

impl fmt::Debug for MultiFactorBacktest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiFactorBacktest")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl MultiFactorBacktest<'static> {
    /// Creates a runner that discards events.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` is invalid.
    pub fn new(config: MultiFactorConfig) -> Result<Self> {
        config.validate()?;
        let backtest = FactorBacktest::new(config.backtest)?;
        Ok(Self { config, backtest })
    }
}

impl MultiFactorBacktest<'_> {
    /// Reports progress to `observer`.
    pub fn with_observer<'b>(self, observer: &'b dyn EngineObserver) -> MultiFactorBacktest<'b> {
        MultiFactorBacktest {
            config: self.config,
            backtest: self.backtest.with_observer(observer),
        }
    }

    /// The active configuration.
    pub const fn config(&self) -> &MultiFactorConfig {
        &self.config
    }

    /// Evaluates every factor, then the weighted composite.
    ///
    /// # Errors
    ///
    /// Fails on an empty factor map, or if a weighted factor is not among
    /// `factors`.
    pub fn run(
        &self,
        factors: &BTreeMap<String, FactorSeries>,
        returns: &ReturnSeries,
    ) -> Result<MultiFactorReport> {
        if factors.is_empty() {
            return Err(FactorLabError::config("multi-factor backtest needs at least one factor"));
        }
        let observer = self.backtest.observer();

        let mut processed = BTreeMap::new();
        let mut individual = BTreeMap::new();
        for (name, factor) in factors {
            let prepared = self.backtest.preprocess(&factor.clone().renamed(name.as_str()));
            let report = self.backtest.run_prepared(&prepared, returns)?;
            processed.insert(name.clone(), prepared);
            individual.insert(name.clone(), report);
        }

        let weights = self.resolve_weights(&individual, observer)?;
        let composite_factor = CompositeBuilder::new(weights.clone()).build(&processed, observer)?;
        let composite = self.backtest.run_prepared(&composite_factor, returns)?;

        let comparison = individual
            .iter()
            .map(|(name, report)| ComparisonRow::from_report(name, report))
            .chain(std::iter::once(ComparisonRow::from_report(
                COMPOSITE_LABEL,
                &composite,
            )))
            .collect();

        Ok(MultiFactorReport {
            individual,
            composite,
            weights,
            comparison,
        })
    }

    /// Loads each of `fields` and close prices from a provider, then runs
    /// [`Self::run`].
    pub fn run_from_provider<P>(
        &self,
        provider: &P,
        request: &DataRequest,
        fields: &[&str],
    ) -> Result<MultiFactorReport>
    where
        P: DataProvider + ?Sized,
    {
        let panel = provider.get_panel(request, fields)?;
        let factors = fields
            .iter()
            .map(|field| Ok((field.to_string(), PanelColumn::from_market_data(&panel, field)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;

        let prices = PanelColumn::from_market_data(&provider.get_prices(request)?, CLOSE_FIELD)?;
        let returns = forward_returns(&prices, self.config.backtest.horizon)?;
        self.run(&factors, &returns)
    }

    fn resolve_weights(
        &self,
        individual: &BTreeMap<String, FactorReport>,
        observer: &dyn EngineObserver,
    ) -> Result<FactorWeights> {
        match (&self.config.weights, self.config.optimize) {
            (Some(raw), _) => FactorWeights::normalize(raw.iter().map(|(k, v)| (k.as_str(), *v))),
            (None, Some(method)) => WeightOptimizer::new(method).optimize(individual, observer),
            (None, None) => FactorWeights::equal(individual.keys().cloned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::COMPOSITE_NAME;
    use approx::assert_abs_diff_eq;
    use factorlab_traits::{Date, InMemoryProvider, MarketData, RecordingObserver, Universe};

    const SYMBOLS: [&str; 6] = ["A", "B", "C", "D", "E", "F"];

    fn d(day: u32) -> Date {
        Date::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn default_runner() -> MultiFactorBacktest<'static> {
        MultiFactorBacktest::new(MultiFactorConfig::default()).unwrap()
    }

    /// `good` ranks symbols by their return, `bad` ranks them in reverse.
    fn inputs() -> (BTreeMap<String, FactorSeries>, ReturnSeries) {
        let mut good = FactorSeries::new("good");
        let mut bad = FactorSeries::new("bad");
        let mut returns = ReturnSeries::new("forward_return_1");
        for day in 1..=8 {
            for (i, s) in SYMBOLS.iter().enumerate() {
                let x = i as f64;
                good.insert(d(day), s.to_string(), x);
                bad.insert(d(day), s.to_string(), -x);
                returns.insert(d(day), s.to_string(), 0.002 * x * (1.0 + 0.1 * day as f64));
            }
        }
        let factors = BTreeMap::from([("good".to_string(), good), ("bad".to_string(), bad)]);
        (factors, returns)
    }

    #[test]
    fn test_config_exclusive_weight_sources() {
        let config = MultiFactorConfig {
            weights: Some(BTreeMap::from([("good".to_string(), 1.0)])),
            optimize: Some(OptimizationMethod::Ic),
            ..Default::default()
        };
        assert!(MultiFactorBacktest::new(config).unwrap_err().is_configuration());

        let config = MultiFactorConfig {
            weights: Some(BTreeMap::from([("good".to_string(), 0.0)])),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_equal_weights_by_default() {
        let (factors, returns) = inputs();
        let report = default_runner().run(&factors, &returns).unwrap();

        assert_eq!(report.individual.len(), 2);
        assert_abs_diff_eq!(report.weights.get("good"), 0.5);
        assert_abs_diff_eq!(report.individual["good"].ic_mean, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(report.individual["bad"].ic_mean, -1.0, epsilon = 1e-9);
        assert_eq!(report.composite.factor, COMPOSITE_NAME);
    }

    #[test]
    fn test_explicit_weights() {
        let (factors, returns) = inputs();
        let config = MultiFactorConfig {
            weights: Some(BTreeMap::from([("good".to_string(), 3.0), ("bad".to_string(), 1.0)])),
            ..Default::default()
        };
        let report = MultiFactorBacktest::new(config).unwrap().run(&factors, &returns).unwrap();

        assert_abs_diff_eq!(report.weights.get("good"), 0.75);
        assert_abs_diff_eq!(report.composite.ic_mean, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_missing_weighted_factor() {
        let (factors, returns) = inputs();
        let config = MultiFactorConfig {
            weights: Some(BTreeMap::from([("other".to_string(), 1.0)])),
            ..Default::default()
        };
        let err = MultiFactorBacktest::new(config)
            .unwrap()
            .run(&factors, &returns)
            .unwrap_err();
        assert!(matches!(err, FactorLabError::MissingFactor(_)));
    }

    #[test]
    fn test_sharpe_optimizer_drops_losing_factor() {
        let (factors, returns) = inputs();
        let config = MultiFactorConfig {
            optimize: Some(OptimizationMethod::Sharpe),
            ..Default::default()
        };
        let observer = RecordingObserver::new();
        let report = MultiFactorBacktest::new(config)
            .unwrap()
            .with_observer(&observer)
            .run(&factors, &returns)
            .unwrap();

        assert_abs_diff_eq!(report.weights.get("good"), 1.0);
        assert_eq!(report.weights.get("bad"), 0.0);
        assert!(observer.saw("weights_optimized"));
        assert!(observer.saw("composite_built"));
    }

    #[test]
    fn test_comparison_table() {
        let (factors, returns) = inputs();
        let report = default_runner().run(&factors, &returns).unwrap();

        let labels: Vec<&str> = report.comparison.iter().map(|r| r.factor.as_str()).collect();
        assert_eq!(labels, vec!["bad", "good", COMPOSITE_LABEL]);

        let frame = report.comparison_frame().unwrap();
        assert_eq!(frame.height(), 3);
        assert_eq!(
            frame.get_column_names_str(),
            vec!["factor", "ic_mean", "icir", "annual_return", "sharpe_ratio", "max_drawdown"]
        );
    }

    #[test]
    fn test_empty_factor_map() {
        let (_, returns) = inputs();
        assert!(
            default_runner()
                .run(&BTreeMap::new(), &returns)
                .is_err()
        );
    }

    #[test]
    fn test_run_from_provider() {
        let mut dates = Vec::new();
        let mut symbols = Vec::new();
        let mut closes = Vec::new();
        let mut size = Vec::new();
        let mut trend = Vec::new();
        for day in 1..=5u32 {
            for (i, s) in SYMBOLS.iter().enumerate() {
                dates.push(format!("2024-01-{day:02}"));
                symbols.push(*s);
                closes.push(100.0 * (1.0 + 0.01 * i as f64).powi(day as i32));
                size.push(10.0 - i as f64);
                trend.push(i as f64);
            }
        }
        let df = df! {
            "date" => dates,
            "symbol" => symbols,
            "close" => closes,
            "size" => size,
            "trend" => trend,
        }
        .unwrap();
        let provider = InMemoryProvider::new(MarketData::new(df));
        let request = DataRequest::new(Universe::default(), d(1), d(5));

        let report = default_runner()
            .run_from_provider(&provider, &request, &["size", "trend"])
            .unwrap();
        assert_eq!(report.individual.len(), 2);
        assert!(report.individual["trend"].ic_mean > 0.0);
        assert_eq!(report.composite.n_dates, 4);
    }
}
