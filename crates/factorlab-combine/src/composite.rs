//! Weighted composite factor construction.

use crate::combiner::{Combiner, FactorScore, WeightedCombiner};
use crate::weights::FactorWeights;
use factorlab_eval::{CrossSection, FactorSeries};
use factorlab_traits::{Date, EngineEvent, EngineObserver, FactorLabError, Result, Symbol};
use ndarray::Array1;
use std::collections::{BTreeMap, BTreeSet};

/// Name given to the composite factor column.
pub const COMPOSITE_NAME: &str = "composite_factor";

/// Builds a composite factor as a weighted sum of preprocessed factors.
///
/// The composite covers the union of `(date, symbol)` keys of the weighted
/// factors. A factor missing a key contributes 0 there.
#[derive(Debug, Clone)]
pub struct CompositeBuilder {
    combiner: WeightedCombiner,
}

impl CompositeBuilder {
    /// Creates a builder for the given weights.
    pub const fn new(weights: FactorWeights) -> Self {
        Self {
            combiner: WeightedCombiner::new(weights),
        }
    }

    /// Weights in use.
    pub const fn weights(&self) -> &FactorWeights {
        self.combiner.weights()
    }

    /// Combines `factors` into a column named [`COMPOSITE_NAME`].
    ///
    /// Factors present in `factors` but absent from the weights are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`FactorLabError::MissingFactor`] if a weighted factor is not
    /// in `factors`.
    pub fn build(
        &self,
        factors: &BTreeMap<String, FactorSeries>,
        observer: &dyn EngineObserver,
    ) -> Result<FactorSeries> {
        let mut weighted = Vec::with_capacity(self.weights().len());
        for name in self.weights().names() {
            let factor = factors
                .get(name)
                .ok_or_else(|| FactorLabError::MissingFactor(name.to_string()))?;
            weighted.push((name, factor));
        }

        let mut keys: BTreeMap<Date, BTreeSet<&Symbol>> = BTreeMap::new();
        for (_, factor) in &weighted {
            for (date, cs) in factor.iter() {
                keys.entry(date).or_default().extend(cs.keys());
            }
        }

        let mut composite = FactorSeries::new(COMPOSITE_NAME);
        for (date, symbols) in keys {
            let scores: Vec<FactorScore> = weighted
                .iter()
                .map(|(name, factor)| FactorScore {
                    name: (*name).to_string(),
                    scores: symbols
                        .iter()
                        .map(|s| factor.get(date, s).unwrap_or(f64::NAN))
                        .collect::<Array1<f64>>(),
                })
                .collect();

            let combined = self.combiner.combine(&scores)?;
            let cross_section: CrossSection = symbols
                .into_iter()
                .cloned()
                .zip(combined.iter().copied())
                .collect();
            composite.set_cross_section(date, cross_section);
        }

        observer.on_event(&EngineEvent::CompositeBuilt {
            factors: self.weights().len(),
            rows: composite.len(),
        });

        Ok(composite)
    }
}
