//! Single-factor backtest.
//!
//! [`FactorBacktest`] chains the engines: preprocess the factor, align it
//! with forward returns, compute Pearson and rank IC, form quantile
//! portfolios and summarise the long-short spread. The result is a
//! [`FactorReport`].

use crate::ic::{CorrelationMethod, IcAnalysis, compute_ic};
use crate::metrics::{MetricsConfig, PerformanceReport};
use crate::panel::{
    AlignedPanel, FactorSeries, PanelColumn, ReturnSeries, align, forward_returns, load_inputs,
};
use crate::preprocess::{PreprocessConfig, Preprocessor};
use crate::quantile::{DEFAULT_N_GROUPS, GroupBacktest, GroupReturnMatrix, group_backtest};
use factorlab_traits::{
    DataProvider, DataRequest, EngineEvent, EngineObserver, FactorLabError, NoopObserver, Result,
    TimeSeries,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Backtesting configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Number of quantile buckets.
    pub n_groups: usize,
    /// Forward return horizon in periods.
    pub horizon: usize,
    /// Cross-sectional preprocessing.
    pub preprocess: PreprocessConfig,
    /// Performance metric settings.
    pub metrics: MetricsConfig,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            n_groups: DEFAULT_N_GROUPS,
            horizon: 1,
            preprocess: PreprocessConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl BacktestConfig {
    /// Checks every field.
    pub fn validate(&self) -> Result<()> {
        if self.n_groups < 2 {
            return Err(FactorLabError::config(format!(
                "n_groups must be at least 2, got {}",
                self.n_groups
            )));
        }
        if self.horizon == 0 {
            return Err(FactorLabError::config("forward return horizon must be at least 1"));
        }
        self.preprocess.validate()?;
        self.metrics.validate()
    }
}

/// Everything a single-factor backtest produces.
///
/// The headline `ic_*` figures are Pearson; `rank_ic` holds the Spearman
/// analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorReport {
    /// Factor name.
    pub factor: String,
    /// Mean Pearson IC.
    pub ic_mean: f64,
    /// Standard deviation of the Pearson IC.
    pub ic_std: f64,
    /// Pearson ICIR.
    pub icir: f64,
    /// Fraction of dates with positive Pearson IC.
    pub ic_positive_rate: f64,
    /// Pearson IC series and summary.
    pub ic: IcAnalysis,
    /// Spearman IC series and summary.
    pub rank_ic: IcAnalysis,
    /// Quantile portfolio results.
    pub groups: GroupBacktest,
    /// Metrics of the long-short spread.
    pub performance: PerformanceReport,
    /// Annualized long-short return.
    pub annual_return: f64,
    /// Annualized long-short volatility.
    pub annual_volatility: f64,
    /// Long-short Sharpe ratio.
    pub sharpe_ratio: f64,
    /// Long-short maximum drawdown.
    pub max_drawdown: f64,
    /// Mean per-date turnover of the long-short book.
    pub turnover: f64,
    /// Number of aligned `(date, symbol)` rows.
    pub n_rows: usize,
    /// Number of aligned dates.
    pub n_dates: usize,
}

impl FactorReport {
    /// Pearson IC per date.
    pub const fn ic_series(&self) -> &TimeSeries {
        &self.ic.series
    }

    /// Per-date bucket mean returns.
    pub const fn group_returns(&self) -> &GroupReturnMatrix {
        &self.groups.returns
    }

    /// Per-date long-short spread.
    pub const fn long_short_returns(&self) -> &TimeSeries {
        &self.groups.long_short
    }

    /// Whether factor and returns had no overlapping keys.
    pub const fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    /// Scalar metrics by name.
    pub fn metrics(&self) -> BTreeMap<String, f64> {
        let mut map: BTreeMap<String, f64> = self
            .performance
            .to_map()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        map.extend([
            ("ic_mean".to_string(), self.ic_mean),
            ("ic_std".to_string(), self.ic_std),
            ("icir".to_string(), self.icir),
            ("ic_positive_rate".to_string(), self.ic_positive_rate),
            ("rank_ic_mean".to_string(), self.rank_ic.summary.mean),
            ("rank_ic_std".to_string(), self.rank_ic.summary.std),
            ("rank_icir".to_string(), self.rank_ic.summary.icir),
            ("rank_ic_positive_rate".to_string(), self.rank_ic.summary.positive_rate),
            ("turnover".to_string(), self.turnover),
        ]);
        map
    }
}

/// Single-factor backtest runner.
#[derive(Clone, Copy)]
pub struct FactorBacktest<'a> {
    config: BacktestConfig,
    preprocessor: Preprocessor,
    observer: &'a dyn EngineObserver,
}

impl fmt::Debug for FactorBacktest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactorBacktest")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FactorBacktest<'static> {
    /// Creates a runner that discards events.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` is invalid.
    pub fn new(config: BacktestConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            preprocessor: Preprocessor::new(config.preprocess)?,
            observer: &NoopObserver,
        })
    }
}

impl<'a> FactorBacktest<'a> {
    /// Reports progress to `observer`.
    pub fn with_observer<'b>(self, observer: &'b dyn EngineObserver) -> FactorBacktest<'b> {
        FactorBacktest {
            config: self.config,
            preprocessor: self.preprocessor,
            observer,
        }
    }

    /// The active configuration.
    pub const fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// The observer events are sent to.
    pub const fn observer(&self) -> &'a dyn EngineObserver {
        self.observer
    }

    /// Applies the configured preprocessing to a raw factor.
    pub fn preprocess(&self, factor: &FactorSeries) -> FactorSeries {
        self.preprocessor.process(factor, self.observer)
    }

    /// Preprocesses `factor` and evaluates it against `returns`.
    pub fn run(&self, factor: &FactorSeries, returns: &ReturnSeries) -> Result<FactorReport> {
        self.observer.on_event(&EngineEvent::RunStarted {
            factor: factor.name(),
        });
        let processed = self.preprocess(factor);
        self.finish(&processed, returns)
    }

    /// Evaluates a factor that is already preprocessed.
    pub fn run_prepared(
        &self,
        factor: &FactorSeries,
        returns: &ReturnSeries,
    ) -> Result<FactorReport> {
        self.observer.on_event(&EngineEvent::RunStarted {
            factor: factor.name(),
        });
        self.finish(factor, returns)
    }

    /// Derives forward returns from close prices, then runs [`Self::run`].
    pub fn run_with_prices(
        &self,
        factor: &FactorSeries,
        prices: &PanelColumn,
    ) -> Result<FactorReport> {
        let returns = forward_returns(prices, self.config.horizon)?;
        self.run(factor, &returns)
    }

    /// Loads `field` and close prices from a provider, then runs [`Self::run`].
    pub fn run_from_provider<P>(
        &self,
        provider: &P,
        request: &DataRequest,
        field: &str,
    ) -> Result<FactorReport>
    where
        P: DataProvider + ?Sized,
    {
        let (factor, returns) = load_inputs(provider, request, field, self.config.horizon)?;
        self.run(&factor, &returns)
    }

    fn finish(&self, factor: &FactorSeries, returns: &ReturnSeries) -> Result<FactorReport> {
        let panel = align(factor, returns);
        self.observer.on_event(&EngineEvent::PanelAligned {
            factor: factor.name(),
            rows: panel.n_rows(),
            dates: panel.n_dates(),
        });
        if panel.is_empty() {
            let message = format!(
                "factor '{}' and forward returns share no observations",
                factor.name()
            );
            self.observer.on_event(&EngineEvent::Warning { message: &message });
        }

        let report = self.evaluate(&panel)?;
        self.observer.on_event(&EngineEvent::RunFinished {
            factor: factor.name(),
        });
        Ok(report)
    }

    /// Runs the IC, quantile and metrics engines on an aligned panel.
    pub fn evaluate(&self, panel: &AlignedPanel) -> Result<FactorReport> {
        let name = panel.factor_name();

        let ic = compute_ic(panel, CorrelationMethod::Pearson);
        let rank_ic = compute_ic(panel, CorrelationMethod::Spearman);
        for analysis in [&ic, &rank_ic] {
            self.observer.on_event(&EngineEvent::IcComputed {
                factor: name,
                method: analysis.method.as_str(),
                mean: analysis.summary.mean,
                std: analysis.summary.std,
                icir: analysis.summary.icir,
                positive_rate: analysis.summary.positive_rate,
            });
        }

        let groups = group_backtest(panel, self.config.n_groups)?;
        self.observer.on_event(&EngineEvent::GroupsComputed {
            factor: name,
            dates: groups.returns.n_dates(),
            collapsed_dates: groups.collapsed_dates,
        });

        let performance =
            PerformanceReport::from_returns(groups.long_short.values(), &self.config.metrics);
        self.observer.on_event(&EngineEvent::PerformanceComputed {
            factor: name,
            annual_return: performance.annual_return,
            sharpe_ratio: performance.sharpe_ratio,
            max_drawdown: performance.max_drawdown,
        });

        Ok(FactorReport {
            factor: name.to_string(),
            ic_mean: ic.summary.mean,
            ic_std: ic.summary.std,
            icir: ic.summary.icir,
            ic_positive_rate: ic.summary.positive_rate,
            annual_return: performance.annual_return,
            annual_volatility: performance.annual_volatility,
            sharpe_ratio: performance.sharpe_ratio,
            max_drawdown: performance.max_drawdown,
            turnover: groups.mean_turnover(),
            n_rows: panel.n_rows(),
            n_dates: panel.n_dates(),
            ic,
            rank_ic,
            groups,
            performance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use factorlab_traits::{Date, InMemoryProvider, MarketData, RecordingObserver, Universe};
    use polars::prelude::*;

    const SYMBOLS: [&str; 6] = ["A", "B", "C", "D", "E", "F"];

    fn d(day: u32) -> Date {
        Date::from_ymd_opt(2024, 1, day).unwrap()
    }

    /// Factor equal to the next-day return plus a per-symbol offset that
    /// preserves the ordering.
    fn predictive_inputs() -> (FactorSeries, ReturnSeries) {
        let mut factor = FactorSeries::new("signal");
        let mut returns = ReturnSeries::new("forward_return_1");
        for day in 1..=10 {
            for (i, s) in SYMBOLS.iter().enumerate() {
                let r = 0.001 * (i as f64 + 1.0) * if day % 2 == 0 { 1.0 } else { 1.5 };
                factor.insert(d(day), s.to_string(), i as f64);
                returns.insert(d(day), s.to_string(), r);
            }
        }
        (factor, returns)
    }

    #[test]
    fn test_backtest_config_default() {
        let config = BacktestConfig::default();
        assert_eq!(config.n_groups, 5);
        assert_eq!(config.horizon, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_backtest_config_validation() {
        let config = BacktestConfig {
            n_groups: 1,
            ..Default::default()
        };
        assert!(FactorBacktest::new(config).unwrap_err().is_configuration());

        let config = BacktestConfig {
            horizon: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_run_predictive_factor() {
        let (factor, returns) = predictive_inputs();
        let config = BacktestConfig {
            n_groups: 3,
            ..Default::default()
        };
        let report = FactorBacktest::new(config).unwrap().run(&factor, &returns).unwrap();

        assert_eq!(report.factor, "signal");
        assert_eq!(report.n_dates, 10);
        assert_eq!(report.n_rows, 60);
        assert_abs_diff_eq!(report.ic_mean, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(report.rank_ic.summary.mean, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(report.ic_positive_rate, 1.0);
        assert!(report.long_short_returns().values().iter().all(|&r| r > 0.0));
        assert!(report.sharpe_ratio > 0.0);
        assert_eq!(report.max_drawdown, 0.0);
        assert_eq!(report.group_returns().n_groups(), 3);
        assert_eq!(report.ic_series().len(), 10);
        assert_eq!(report.turnover, 0.0);
    }

    #[test]
    fn test_run_emits_events() {
        let (factor, returns) = predictive_inputs();
        let observer = RecordingObserver::new();
        let backtest = FactorBacktest::new(BacktestConfig::default())
            .unwrap()
            .with_observer(&observer);
        backtest.run(&factor, &returns).unwrap();

        assert_eq!(
            observer.events(),
            vec![
                "run_started",
                "preprocessed",
                "panel_aligned",
                "ic_computed",
                "ic_computed",
                "groups_computed",
                "performance_computed",
                "run_finished",
            ]
        );
    }

    #[test]
    fn test_no_overlap_gives_empty_report() {
        let (factor, _) = predictive_inputs();
        let returns = ReturnSeries::from_triples("r", vec![(d(20), "A", 0.01)]);
        let observer = RecordingObserver::new();
        let report = FactorBacktest::new(BacktestConfig::default())
            .unwrap()
            .with_observer(&observer)
            .run(&factor, &returns)
            .unwrap();

        assert!(report.is_empty());
        assert!(report.ic_mean.is_nan());
        assert!(report.annual_return.is_nan());
        assert_eq!(report.sharpe_ratio, 0.0);
        assert!(observer.saw("warning"));
    }

    #[test]
    fn test_run_with_prices() {
        let mut factor = FactorSeries::new("momentum");
        let mut prices = PanelColumn::new("close");
        for day in 1..=5 {
            for (i, s) in SYMBOLS.iter().enumerate() {
                let growth = 1.0 + 0.01 * i as f64;
                prices.insert(d(day), s.to_string(), 100.0 * growth.powi(day as i32));
                factor.insert(d(day), s.to_string(), i as f64);
            }
        }

        let report = FactorBacktest::new(BacktestConfig::default())
            .unwrap()
            .run_with_prices(&factor, &prices)
            .unwrap();
        assert_eq!(report.n_dates, 4);
        assert_abs_diff_eq!(report.ic_mean, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_run_from_provider() {
        let mut dates = Vec::new();
        let mut symbols = Vec::new();
        let mut closes = Vec::new();
        let mut values = Vec::new();
        for day in 1..=4u32 {
            for (i, s) in SYMBOLS.iter().enumerate() {
                dates.push(format!("2024-01-{day:02}"));
                symbols.push(*s);
                closes.push(10.0 + day as f64 * (i as f64 + 1.0));
                values.push(i as f64);
            }
        }
        let df = df! {
            "date" => dates,
            "symbol" => symbols,
            "close" => closes,
            "value" => values,
        }
        .unwrap();
        let provider = InMemoryProvider::new(MarketData::new(df));
        let request = DataRequest::new(Universe::default(), d(1), d(4));

        let report = FactorBacktest::new(BacktestConfig::default())
            .unwrap()
            .run_from_provider(&provider, &request, "value")
            .unwrap();
        assert_eq!(report.factor, "value");
        assert_eq!(report.n_dates, 3);
        assert!(report.ic_mean > 0.0);
    }

    #[test]
    fn test_report_metrics_map() {
        let (factor, returns) = predictive_inputs();
        let report = FactorBacktest::new(BacktestConfig::default())
            .unwrap()
            .run(&factor, &returns)
            .unwrap();
        let metrics = report.metrics();

        for key in [
            "ic_mean",
            "ic_std",
            "icir",
            "ic_positive_rate",
            "annual_return",
            "annual_volatility",
            "sharpe_ratio",
            "max_drawdown",
            "rank_ic_mean",
            "turnover",
        ] {
            assert!(metrics.contains_key(key), "missing {key}");
        }
        assert_eq!(metrics["sharpe_ratio"], report.sharpe_ratio);
    }

    #[test]
    fn test_report_serializes() {
        let (factor, returns) = predictive_inputs();
        let report = FactorBacktest::new(BacktestConfig::default())
            .unwrap()
            .run(&factor, &returns)
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["factor"], "signal");
        assert!(json["groups"]["long_short"].is_object());
    }
}
