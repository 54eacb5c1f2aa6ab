//! User-defined factor expressions.

use crate::FactorExpression;
use factorlab_traits::{FactorLabError, Result};
use serde::{Deserialize, Serialize};

/// A named formula supplied by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFactor {
    name: String,
    expression: String,
    #[serde(default)]
    description: String,
}

impl CustomFactor {
    /// Creates a custom factor.
    ///
    /// # Errors
    ///
    /// An empty name or expression is a configuration error.
    pub fn new(
        name: impl Into<String>,
        expression: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        let expression = expression.into();
        if name.trim().is_empty() {
            return Err(FactorLabError::config("custom factor name is empty"));
        }
        if expression.trim().is_empty() {
            return Err(FactorLabError::config(format!(
                "custom factor '{name}' has an empty expression"
            )));
        }
        Ok(Self {
            name,
            expression,
            description: description.into(),
        })
    }

    /// Factor name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Example compositions shipped with the registry.
    pub fn builtin() -> Vec<Self> {
        [
            (
                "price_volume_momentum",
                "(Ref($close, 20) / $close - 1) * ($volume / Mean($volume, 20))",
                "Momentum scaled by volume ratio",
            ),
            (
                "vol_adj_momentum",
                "(Ref($close, 20) / $close - 1) / Std($close / Ref($close, 1) - 1, 20)",
                "Volatility-adjusted momentum",
            ),
            (
                "relative_strength",
                "(Ref($close, 60) / $close - 1) - (Ref($close, 20) / $close - 1)",
                "Long-term minus short-term momentum",
            ),
            (
                "price_acceleration",
                "(Ref($close, 1) / $close - 1) - (Ref($close, 2) / Ref($close, 1) - 1)",
                "Change in daily price change",
            ),
            (
                "vol_price_div",
                "Corr($close, $volume, 20) * -1",
                "Negative price/volume correlation",
            ),
            (
                "high_low_ratio",
                "Mean(($high - $low) / $close, 20)",
                "Average daily range",
            ),
            (
                "close_position",
                "($close - $low) / ($high - $low)",
                "Close within the daily range",
            ),
            (
                "trend_strength",
                "($close - Mean($close, 20)) / Std($close, 20)",
                "Standardized distance from the moving average",
            ),
            (
                "amount_volatility",
                "Std($amount / Ref($amount, 1) - 1, 20)",
                "Volatility of traded amount changes",
            ),
            (
                "multi_period_momentum",
                "0.5 * (Ref($close, 5) / $close - 1) + 0.3 * (Ref($close, 20) / $close - 1) + 0.2 * (Ref($close, 60) / $close - 1)",
                "Blend of 5, 20 and 60 day momentum",
            ),
        ]
        .into_iter()
        .map(|(name, expression, description)| Self {
            name: name.to_string(),
            expression: expression.to_string(),
            description: description.to_string(),
        })
        .collect()
    }
}

impl FactorExpression for CustomFactor {
    fn expression(&self) -> String {
        self.expression.clone()
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates() {
        assert!(CustomFactor::new("", "$close", "").is_err());
        assert!(CustomFactor::new("x", "  ", "").unwrap_err().is_configuration());

        let factor = CustomFactor::new("spread", "$high - $low", "range").unwrap();
        assert_eq!(factor.name(), "spread");
        assert_eq!(factor.expression(), "$high - $low");
        assert_eq!(factor.description(), "range");
    }

    #[test]
    fn test_builtin_are_valid() {
        for factor in CustomFactor::builtin() {
            assert!(CustomFactor::new(factor.name(), factor.expression(), "").is_ok());
        }
    }
}
