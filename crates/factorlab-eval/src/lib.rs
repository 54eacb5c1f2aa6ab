//! Single-factor evaluation for factorlab.
//!
//! This crate turns a factor panel and forward returns into a full
//! evaluation:
//! - Panel alignment and forward return derivation
//! - Cross-sectional winsorizing and standardization
//! - Information Coefficient (Pearson and rank) series and summaries
//! - Quantile-sorted portfolios and the long-short spread
//! - Risk-adjusted performance metrics
//!
//! # Example
//!
//! ```rust,ignore
//! use factorlab_eval::{BacktestConfig, FactorBacktest};
//!
//! let backtest = FactorBacktest::new(BacktestConfig::default())?;
//! let report = backtest.run(&factor, &forward_returns)?;
//! println!("IC mean: {:.4}, Sharpe: {:.2}", report.ic_mean, report.sharpe_ratio);
//! ```

pub mod backtest;
pub mod ic;
pub mod metrics;
pub mod panel;
pub mod preprocess;
pub mod quantile;

// Re-export main types
pub use backtest::{BacktestConfig, FactorBacktest, FactorReport};
pub use ic::{CorrelationMethod, IcAnalysis, IcSummary, calculate_ic, compute_ic};
pub use metrics::{MetricsConfig, PerformanceReport};
pub use panel::{
    AlignedPanel, CrossSection, FactorSeries, PanelColumn, PanelRow, ReturnSeries, align,
    forward_returns, load_inputs,
};
pub use preprocess::{PreprocessConfig, Preprocessor, WinsorizeMethod};
pub use quantile::{GroupBacktest, GroupReturnMatrix, group_backtest, quantile_buckets};
