//! Multi-factor combination for factorlab.
//!
//! This crate combines several standardized factors into one composite and
//! evaluates it next to the individual factors:
//! - Normalized factor weights
//! - A weighted combiner that treats missing scores as zero contribution
//! - Heuristic weight optimization from IC or Sharpe
//! - The multi-factor backtest and its comparison table
//!
//! # Examples
//!
//! ```rust,no_run
//! use factorlab_combine::{Combiner, FactorScore, FactorWeights, WeightedCombiner};
//! use ndarray::Array1;
//!
//! let weights = FactorWeights::equal(["momentum", "value"]).unwrap();
//! let combiner = WeightedCombiner::new(weights);
//! let factors = vec![
//!     FactorScore {
//!         name: "momentum".to_string(),
//!         scores: Array1::from_vec(vec![0.5, -0.2, f64::NAN]),
//!     },
//!     FactorScore {
//!         name: "value".to_string(),
//!         scores: Array1::from_vec(vec![-0.3, 0.8, 0.1]),
//!     },
//! ];
//!
//! let composite = combiner.combine(&factors).unwrap();
//! ```

mod combiner;
mod composite;
mod multi;
mod optimizer;
mod weights;

// Re-export main types
pub use combiner::{Combiner, FactorScore, WeightedCombiner};
pub use composite::{COMPOSITE_NAME, CompositeBuilder};
pub use multi::{
    COMPOSITE_LABEL, ComparisonRow, MultiFactorBacktest, MultiFactorConfig, MultiFactorReport,
};
pub use optimizer::{OptimizationMethod, WeightOptimizer};
pub use weights::FactorWeights;
