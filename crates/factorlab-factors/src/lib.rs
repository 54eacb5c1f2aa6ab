//! Factor definitions for factorlab.
//!
//! This crate describes factors as formulas over panel fields:
//! - Technical: momentum, oscillators, bands, volume and dispersion indicators
//! - Fundamental: valuation, profitability, leverage and growth
//! - Custom: named user expressions
//!
//! Evaluating the formulas is left to the data provider.
//!
//! # Example
//!
//! ```rust
//! use factorlab_factors::{FactorExpression, FactorRegistry};
//!
//! let registry = FactorRegistry::builtin();
//! let momentum = registry.get("momentum_20").unwrap();
//! assert_eq!(momentum.expression(), "Ref($close, 20) / $close - 1");
//! ```

pub mod custom;
pub mod fundamental;
pub mod registry;
pub mod technical;

// Re-export key types
pub use custom::CustomFactor;
pub use fundamental::FundamentalFactor;
pub use registry::{FactorCategory, FactorDefinition, FactorRegistry};
pub use technical::TechnicalFactor;

/// Anything that renders to a factor formula.
pub trait FactorExpression {
    /// The formula over `$field` references.
    fn expression(&self) -> String;

    /// Short human-readable description.
    fn description(&self) -> &str;
}
