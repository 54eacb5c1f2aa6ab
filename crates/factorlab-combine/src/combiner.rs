//! Core trait definition for factor combiners.

use crate::weights::FactorWeights;
use factorlab_traits::{FactorLabError, Result};
use ndarray::Array1;

/// One factor's scores over a single cross-section.
///
/// Every factor in a combination covers the same instruments in the same
/// order. Instruments without a value carry NaN.
#[derive(Debug, Clone)]
pub struct FactorScore {
    /// Factor name, used to look up its weight.
    pub name: String,

    /// Standardized scores for each instrument of the cross-section.
    pub scores: Array1<f64>,
}

/// Combines multiple factor scores into a composite score.
///
/// Implementations must be thread-safe so cross-sections can be combined in
/// parallel.
///
/// # Examples
///
/// ```rust,no_run
/// use factorlab_combine::{Combiner, FactorScore};
/// use ndarray::Array1;
///
/// struct FirstOnly;
///
/// impl Combiner for FirstOnly {
///     fn combine(&self, factors: &[FactorScore]) -> factorlab_traits::Result<Array1<f64>> {
///         Ok(factors[0].scores.clone())
///     }
///
///     fn name(&self) -> &str {
///         "first_only"
///     }
/// }
/// ```
pub trait Combiner: Send + Sync {
    /// Combine several factors into one score vector.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No factors are provided
    /// - Score vectors have mismatched lengths
    fn combine(&self, factors: &[FactorScore]) -> Result<Array1<f64>>;

    /// Name of this combination strategy.
    fn name(&self) -> &str;
}

/// Checks that factors are present and equally long, returning the length.
fn common_length(factors: &[FactorScore]) -> Result<usize> {
    let Some(first) = factors.first() else {
        return Err(FactorLabError::config("cannot combine zero factors"));
    };

    let n = first.scores.len();
    for factor in factors {
        if factor.scores.len() != n {
            return Err(FactorLabError::InvalidData(format!(
                "factor '{}' has {} scores, expected {}",
                factor.name,
                factor.scores.len(),
                n
            )));
        }
    }
    Ok(n)
}

/// Linear combination with fixed, normalized weights.
///
/// A missing (non-finite) score contributes 0 instead of nulling the
/// composite, so partial coverage still yields a value for every instrument.
/// Factors without a weight are ignored.
#[derive(Debug, Clone)]
pub struct WeightedCombiner {
    weights: FactorWeights,
}

impl WeightedCombiner {
    /// Create a combiner with the given weights.
    pub const fn new(weights: FactorWeights) -> Self {
        Self { weights }
    }

    /// The weights in use.
    pub const fn weights(&self) -> &FactorWeights {
        &self.weights
    }
}

impl Combiner for WeightedCombiner {
    fn combine(&self, factors: &[FactorScore]) -> Result<Array1<f64>> {
        let n = common_length(factors)?;

        for name in self.weights.names() {
            if !factors.iter().any(|f| f.name == name) {
                return Err(FactorLabError::MissingFactor(name.to_string()));
            }
        }

        let mut composite = Array1::zeros(n);
        for factor in factors {
            let weight = self.weights.get(&factor.name);
            if weight == 0.0 {
                continue;
            }
            let filled = factor.scores.mapv(|s| if s.is_finite() { s } else { 0.0 });
            composite.scaled_add(weight, &filled);
        }

        Ok(composite)
    }

    fn name(&self) -> &str {
        "weighted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn score(name: &str, scores: Array1<f64>) -> FactorScore {
        FactorScore {
            name: name.to_string(),
            scores,
        }
    }

    #[test]
    fn test_missing_values_contribute_zero() {
        let weights = FactorWeights::normalize([("a", 0.5), ("b", 0.5)]).unwrap();
        let combiner = WeightedCombiner::new(weights);
        let composite = combiner
            .combine(&[
                score("a", array![1.0, f64::NAN]),
                score("b", array![f64::NAN, 1.0]),
            ])
            .unwrap();

        assert_abs_diff_eq!(composite[0], 0.5);
        assert_abs_diff_eq!(composite[1], 0.5);
    }

    #[test]
    fn test_weighted_sum() {
        let weights = FactorWeights::normalize([("a", 3.0), ("b", 1.0)]).unwrap();
        let composite = WeightedCombiner::new(weights)
            .combine(&[score("a", array![1.0, -1.0]), score("b", array![2.0, 2.0])])
            .unwrap();
        assert_abs_diff_eq!(composite[0], 1.25, epsilon = 1e-12);
        assert_abs_diff_eq!(composite[1], -0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_unweighted_factor_ignored() {
        let weights = FactorWeights::equal(["a"]).unwrap();
        let composite = WeightedCombiner::new(weights)
            .combine(&[score("a", array![1.0]), score("z", array![100.0])])
            .unwrap();
        assert_abs_diff_eq!(composite[0], 1.0);
    }

    #[test]
    fn test_missing_weighted_factor() {
        let weights = FactorWeights::equal(["a", "b"]).unwrap();
        let err = WeightedCombiner::new(weights)
            .combine(&[score("a", array![1.0])])
            .unwrap_err();
        assert!(matches!(err, FactorLabError::MissingFactor(ref name) if name == "b"));
    }

    #[test]
    fn test_mismatched_lengths() {
        let weights = FactorWeights::equal(["a", "b"]).unwrap();
        let result = WeightedCombiner::new(weights)
            .combine(&[score("a", array![1.0, 2.0]), score("b", array![1.0])]);
        assert!(matches!(result, Err(FactorLabError::InvalidData(_))));
    }

    #[test]
    fn test_empty_input() {
        let weights = FactorWeights::equal(["a"]).unwrap();
        assert!(WeightedCombiner::new(weights).combine(&[]).is_err());
    }
}
