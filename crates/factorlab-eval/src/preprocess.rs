//! Cross-sectional factor preprocessing.
//!
//! Each date is processed independently: winsorize, then z-score. Market-cap
//! or sector neutralization needs an exposure model this crate does not have,
//! so requesting it only emits [`EngineEvent::NeutralizationSkipped`].

use crate::panel::{CrossSection, FactorSeries};
use factorlab_traits::stats::{clip, mean, quantile, sample_std, standardize};
use factorlab_traits::{EngineEvent, EngineObserver, FactorLabError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default number of standard deviations for [`WinsorizeMethod::Std`].
pub const DEFAULT_WINSORIZE_STD: f64 = 3.0;

/// Default quantile bounds for [`WinsorizeMethod::Quantile`].
pub const DEFAULT_WINSORIZE_QUANTILES: (f64, f64) = (0.01, 0.99);

/// Outlier clipping policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum WinsorizeMethod {
    /// Clip to `mean ± n_std * std` of the cross-section.
    Std {
        /// Width of the band in sample standard deviations.
        n_std: f64,
    },
    /// Clip to the empirical `lower` and `upper` quantiles of the cross-section.
    Quantile {
        /// Lower quantile in `[0, 1]`.
        lower: f64,
        /// Upper quantile in `[0, 1]`.
        upper: f64,
    },
}

impl WinsorizeMethod {
    /// Method name as accepted by [`FromStr`].
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Std { .. } => "std",
            Self::Quantile { .. } => "quantile",
        }
    }

    /// Checks that the bounds are usable.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Std { n_std } => {
                if !(n_std.is_finite() && n_std > 0.0) {
                    return Err(FactorLabError::config(format!(
                        "winsorize n_std must be positive, got {n_std}"
                    )));
                }
            }
            Self::Quantile { lower, upper } => {
                if !(0.0..=1.0).contains(&lower) || !(0.0..=1.0).contains(&upper) || lower >= upper
                {
                    return Err(FactorLabError::config(format!(
                        "winsorize quantiles must satisfy 0 <= lower < upper <= 1, got ({lower}, {upper})"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Clips one cross-section in place.
    pub fn apply(&self, values: &mut [f64]) {
        match *self {
            Self::Std { n_std } => winsorize_std(values, n_std),
            Self::Quantile { lower, upper } => winsorize_quantile(values, lower, upper),
        }
    }
}

impl Default for WinsorizeMethod {
    fn default() -> Self {
        Self::Std {
            n_std: DEFAULT_WINSORIZE_STD,
        }
    }
}

impl fmt::Display for WinsorizeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WinsorizeMethod {
    type Err = FactorLabError;

    /// Parses a method name into the method with its default bounds.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "std" => Ok(Self::default()),
            "quantile" => {
                let (lower, upper) = DEFAULT_WINSORIZE_QUANTILES;
                Ok(Self::Quantile { lower, upper })
            }
            other => Err(FactorLabError::config(format!(
                "unknown winsorize method '{other}', expected 'std' or 'quantile'"
            ))),
        }
    }
}

/// Clips to `mean ± n_std * std`. No-op when the std is undefined.
pub fn winsorize_std(values: &mut [f64], n_std: f64) {
    let m = mean(values);
    let s = sample_std(values);
    clip(values, m - n_std * s, m + n_std * s);
}

/// Clips to the empirical `[lower, upper]` quantiles.
pub fn winsorize_quantile(values: &mut [f64], lower: f64, upper: f64) {
    let lo = quantile(values, lower);
    let hi = quantile(values, upper);
    clip(values, lo, hi);
}

/// Preprocessing switches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Clip outliers before standardizing.
    pub winsorize: bool,
    /// Clipping policy.
    pub winsorize_method: WinsorizeMethod,
    /// Z-score each cross-section.
    pub standardize: bool,
    /// Request market-cap neutralization (currently skipped).
    pub neutralize: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            winsorize: true,
            winsorize_method: WinsorizeMethod::default(),
            standardize: true,
            neutralize: false,
        }
    }
}

impl PreprocessConfig {
    /// Leaves factor values untouched.
    pub const fn disabled() -> Self {
        Self {
            winsorize: false,
            winsorize_method: WinsorizeMethod::Std {
                n_std: DEFAULT_WINSORIZE_STD,
            },
            standardize: false,
            neutralize: false,
        }
    }

    /// Checks the winsorize bounds, even when winsorizing is off.
    pub fn validate(&self) -> Result<()> {
        self.winsorize_method.validate()
    }
}

/// Applies [`PreprocessConfig`] to factor series.
#[derive(Debug, Clone, Copy, Default)]
pub struct Preprocessor {
    config: PreprocessConfig,
}

impl Preprocessor {
    /// Creates a preprocessor, validating the configuration.
    pub fn new(config: PreprocessConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The active configuration.
    pub const fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Transforms one cross-section. Keys are preserved.
    pub fn process_cross_section(&self, cross_section: &CrossSection) -> CrossSection {
        let mut values: Vec<f64> = cross_section.values().copied().collect();

        if self.config.winsorize {
            self.config.winsorize_method.apply(&mut values);
        }
        if self.config.standardize {
            values = standardize(&values).0;
        }

        cross_section.keys().cloned().zip(values).collect()
    }

    /// Transforms every date of `factor`.
    ///
    /// The output keeps every input key. Dates whose standard deviation is
    /// zero come out all NaN when standardizing.
    pub fn process(&self, factor: &FactorSeries, observer: &dyn EngineObserver) -> FactorSeries {
        let mut output = FactorSeries::new(factor.name());
        for (date, cross_section) in factor.iter() {
            output.set_cross_section(date, self.process_cross_section(cross_section));
        }

        observer.on_event(&EngineEvent::Preprocessed {
            factor: factor.name(),
            dates: output.n_dates(),
            winsorized: self.config.winsorize,
            standardized: self.config.standardize,
        });

        if self.config.neutralize {
            observer.on_event(&EngineEvent::NeutralizationSkipped {
                factor: factor.name(),
            });
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use factorlab_traits::{Date, NoopObserver, RecordingObserver};

    fn d(day: u32) -> Date {
        Date::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_winsorize_std_clips_outlier() {
        let mut values: Vec<f64> = (0..20).map(|i| i as f64 * 0.1).collect();
        values.push(100.0);
        let m = mean(&values);
        let s = sample_std(&values);

        winsorize_std(&mut values, 3.0);
        assert_abs_diff_eq!(values[20], m + 3.0 * s, epsilon = 1e-12);
        assert_abs_diff_eq!(values[0], 0.0);
    }

    #[test]
    fn test_winsorize_std_single_value_is_noop() {
        let mut values = vec![5.0];
        winsorize_std(&mut values, 3.0);
        assert_eq!(values, vec![5.0]);
    }

    #[test]
    fn test_winsorize_quantile() {
        let mut values: Vec<f64> = (0..=100).map(f64::from).collect();
        winsorize_quantile(&mut values, 0.05, 0.95);
        assert_abs_diff_eq!(values[0], 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(values[100], 95.0, epsilon = 1e-12);
        assert_abs_diff_eq!(values[50], 50.0);
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("std".parse::<WinsorizeMethod>().unwrap(), WinsorizeMethod::default());
        assert_eq!(
            "Quantile".parse::<WinsorizeMethod>().unwrap(),
            WinsorizeMethod::Quantile {
                lower: 0.01,
                upper: 0.99
            }
        );
        assert!("mad".parse::<WinsorizeMethod>().unwrap_err().is_configuration());
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let config = PreprocessConfig {
            winsorize_method: WinsorizeMethod::Quantile {
                lower: 0.9,
                upper: 0.1,
            },
            ..Default::default()
        };
        assert!(Preprocessor::new(config).is_err());

        let config = PreprocessConfig {
            winsorize_method: WinsorizeMethod::Std { n_std: -1.0 },
            ..Default::default()
        };
        assert!(Preprocessor::new(config).is_err());
    }

    #[test]
    fn test_process_standardizes_each_date() {
        let factor = FactorSeries::from_triples(
            "f",
            vec![
                (d(1), "A", 1.0),
                (d(1), "B", 2.0),
                (d(1), "C", 3.0),
                (d(2), "A", 10.0),
                (d(2), "B", 30.0),
            ],
        );
        let preprocessor = Preprocessor::new(PreprocessConfig::default()).unwrap();
        let processed = preprocessor.process(&factor, &NoopObserver);

        assert_eq!(processed.len(), factor.len());
        assert_abs_diff_eq!(processed.get(d(1), "A").unwrap(), -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(processed.get(d(1), "B").unwrap(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(
            processed.get(d(2), "B").unwrap(),
            std::f64::consts::FRAC_1_SQRT_2,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_process_zero_std_is_nan() {
        let factor = FactorSeries::from_triples("f", vec![(d(1), "A", 2.0), (d(1), "B", 2.0)]);
        let processed = Preprocessor::default().process(&factor, &NoopObserver);
        assert!(processed.get(d(1), "A").unwrap().is_nan());
        assert!(processed.get(d(1), "B").unwrap().is_nan());
    }

    #[test]
    fn test_process_small_scale_factor_is_standardized() {
        let factor = FactorSeries::from_triples(
            "f",
            vec![
                (d(1), "A", 1e-11),
                (d(1), "B", 2e-11),
                (d(1), "C", 3e-11),
                (d(1), "D", 4e-11),
            ],
        );
        let processed = Preprocessor::default().process(&factor, &NoopObserver);

        let a = processed.get(d(1), "A").unwrap();
        let d_value = processed.get(d(1), "D").unwrap();
        assert!(a.is_finite() && d_value.is_finite());
        assert_abs_diff_eq!(a, -1.161895003862225, epsilon = 1e-9);
        assert_abs_diff_eq!(a + d_value, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_process_keeps_missing_values_missing() {
        let factor = FactorSeries::from_triples(
            "f",
            vec![(d(1), "A", 1.0), (d(1), "B", f64::NAN), (d(1), "C", 3.0)],
        );
        let processed = Preprocessor::default().process(&factor, &NoopObserver);
        assert!(processed.get(d(1), "B").unwrap().is_nan());
        assert!(processed.get(d(1), "A").unwrap().is_finite());
    }

    #[test]
    fn test_disabled_is_identity() {
        let factor = FactorSeries::from_triples("f", vec![(d(1), "A", 1.0), (d(1), "B", 7.0)]);
        let preprocessor = Preprocessor::new(PreprocessConfig::disabled()).unwrap();
        assert_eq!(preprocessor.process(&factor, &NoopObserver), factor);
    }

    #[test]
    fn test_neutralize_emits_skip_event() {
        let factor = FactorSeries::from_triples("f", vec![(d(1), "A", 1.0), (d(1), "B", 2.0)]);
        let config = PreprocessConfig {
            neutralize: true,
            ..Default::default()
        };
        let observer = RecordingObserver::new();
        Preprocessor::new(config).unwrap().process(&factor, &observer);
        assert_eq!(observer.events(), vec!["preprocessed", "neutralization_skipped"]);
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: PreprocessConfig =
            serde_json::from_str(r#"{"winsorize_method": {"method": "quantile", "lower": 0.05, "upper": 0.95}}"#)
                .unwrap();
        assert!(config.winsorize);
        assert!(config.standardize);
        assert_eq!(config.winsorize_method.name(), "quantile");
    }
}
