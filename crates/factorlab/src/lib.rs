#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/factorlab/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! # factorlab
//!
//! Umbrella crate that re-exports the factorlab sub-crates.
//!
//! ## Crate Organization
//!
//! - [`traits`] - Errors, panel types, the data provider and observer interfaces
//! - [`eval`] - Single-factor evaluation engines and [`FactorBacktest`]
//! - [`combine`] - Composite factors, weight heuristics and [`MultiFactorBacktest`]
//! - [`factors`] - Factor definition registry
//!
//! ## Pipeline
//!
//! 1. **Preprocess** each date's cross-section (winsorize, standardize)
//! 2. **Align** factor values with forward returns
//! 3. **Evaluate** IC and quantile portfolios per date
//! 4. **Summarize** the long-short spread with risk-adjusted metrics
//! 5. **Combine** several factors and evaluate the composite the same way

/// Version information for the factorlab crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Core Types
// ============================================================================

/// Errors, panel types and interfaces shared by every crate.
pub mod traits {
    pub use factorlab_traits::*;
}

pub use factorlab_traits::{
    DataProvider, DataRequest, Date, EngineEvent, EngineObserver, FactorLabError, MarketData,
    Result, Symbol, TimeSeries,
};

// ============================================================================
// Evaluation
// ============================================================================

/// Single-factor evaluation.
///
/// ## Information Coefficient (IC)
///
/// Cross-sectional correlation between factor values and forward returns:
///
/// ```text
/// IC_t = corr(factor_t, returns_{t+horizon})
/// ICIR = mean(IC) / std(IC)
/// ```
///
/// ## Quantile Portfolios
///
/// Each date, instruments are sorted into equal-frequency buckets by factor
/// value. The long-short spread holds the top bucket against the bottom one.
pub mod eval {
    pub use factorlab_eval::*;
}

pub use factorlab_eval::{BacktestConfig, FactorBacktest, FactorReport, FactorSeries, ReturnSeries};

// ============================================================================
// Combination
// ============================================================================

/// Multi-factor composites and weight heuristics.
pub mod combine {
    pub use factorlab_combine::*;
}

pub use factorlab_combine::{
    Combiner, FactorWeights, MultiFactorBacktest, MultiFactorConfig, MultiFactorReport,
    OptimizationMethod,
};

// ============================================================================
// Factor Definitions
// ============================================================================

/// Technical, fundamental and custom factor definitions.
pub mod factors {
    pub use factorlab_factors::*;
}

// ============================================================================
// Prelude
// ============================================================================

/// Prelude module for convenient imports.
///
/// ```ignore
/// use factorlab::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        BacktestConfig, Combiner, DataProvider, DataRequest, Date, EngineObserver,
        FactorBacktest, FactorLabError, FactorReport, FactorSeries, FactorWeights, MarketData,
        MultiFactorBacktest, MultiFactorConfig, MultiFactorReport, OptimizationMethod, Result,
        ReturnSeries, Symbol,
    };
    pub use factorlab_factors::{FactorExpression, FactorRegistry};
    pub use factorlab_traits::{InMemoryProvider, NoopObserver, TracingObserver, Universe};
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use super::VERSION;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        let parts: Vec<&str> = VERSION.split('.').collect();
        assert!(parts.len() >= 2, "Version should have at least major.minor");
    }

    #[test]
    fn test_re_exports() {
        fn _accept_combiner(_combiner: &dyn Combiner) {}
        fn _accept_observer(_observer: &dyn EngineObserver) {}
        fn _accept_provider(_provider: &dyn DataProvider) {}
    }

    #[test]
    fn test_end_to_end_through_prelude() {
        let d = |day| Date::from_ymd_opt(2024, 2, day).unwrap();
        let mut factor = FactorSeries::new("trend");
        let mut returns = ReturnSeries::new("forward_return_1");
        for day in 1..=5 {
            for (i, s) in ["A", "B", "C", "D", "E"].iter().enumerate() {
                factor.insert(d(day), s.to_string(), i as f64);
                returns.insert(d(day), s.to_string(), 0.001 * i as f64 * day as f64);
            }
        }

        let report = FactorBacktest::new(BacktestConfig::default())
            .unwrap()
            .with_observer(&NoopObserver)
            .run(&factor, &returns)
            .unwrap();
        assert!((report.ic_mean - 1.0).abs() < 1e-9);
        assert!(FactorRegistry::builtin().get("momentum_20").is_ok());
    }
}
