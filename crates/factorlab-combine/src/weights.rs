//! Normalized factor weights.

use factorlab_traits::{FactorLabError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Factor name to weight, normalized to sum to 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactorWeights {
    weights: BTreeMap<String, f64>,
}

impl FactorWeights {
    /// Equal weight for every name.
    ///
    /// # Errors
    ///
    /// Fails when `names` is empty.
    pub fn equal<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::normalize(names.into_iter().map(|name| (name.into(), 1.0)))
    }

    /// Divides raw weights by their sum.
    ///
    /// # Errors
    ///
    /// Empty input, a negative or non-finite weight, and weights summing to
    /// zero are configuration errors.
    pub fn normalize<I, S>(raw: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut weights = BTreeMap::new();
        for (name, weight) in raw {
            let name = name.into();
            if !weight.is_finite() || weight < 0.0 {
                return Err(FactorLabError::config(format!(
                    "weight for '{name}' must be a non-negative number, got {weight}"
                )));
            }
            weights.insert(name, weight);
        }

        if weights.is_empty() {
            return Err(FactorLabError::config("no factor weights given"));
        }

        let total: f64 = weights.values().sum();
        if total <= 0.0 {
            return Err(FactorLabError::config("factor weights sum to zero"));
        }

        for weight in weights.values_mut() {
            *weight /= total;
        }

        Ok(Self { weights })
    }

    /// Weight of a factor, 0 if it is not listed.
    pub fn get(&self, name: &str) -> f64 {
        self.weights.get(name).copied().unwrap_or(0.0)
    }

    /// Whether the factor is listed.
    pub fn contains(&self, name: &str) -> bool {
        self.weights.contains_key(name)
    }

    /// Iterates over `(name, weight)` in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.weights.iter().map(|(name, w)| (name.as_str(), *w))
    }

    /// Listed factor names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.weights.keys().map(String::as_str)
    }

    /// Number of listed factors.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Whether no factor is listed.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Sum of the weights, 1 up to rounding.
    pub fn total(&self) -> f64 {
        self.weights.values().sum()
    }

    /// The underlying map.
    pub const fn as_map(&self) -> &BTreeMap<String, f64> {
        &self.weights
    }
}
