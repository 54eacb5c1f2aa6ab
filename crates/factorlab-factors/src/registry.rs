//! Factor registry for looking up and categorizing factor definitions.
//!
//! Definitions are resolved by key through an explicit map. Built-in
//! technical and fundamental definitions are fixed; custom definitions can
//! be added at runtime.

use crate::FactorExpression;
use crate::custom::CustomFactor;
use crate::fundamental::FundamentalFactor;
use crate::technical::TechnicalFactor;
use factorlab_traits::{FactorLabError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Factor category classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorCategory {
    /// Price and volume indicators
    Technical,
    /// Reported financial metrics
    Fundamental,
    /// User expressions
    Custom,
}

impl FactorCategory {
    /// All categories in display order.
    pub const ALL: [Self; 3] = [Self::Technical, Self::Fundamental, Self::Custom];

    /// Get a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &str {
        match self {
            Self::Technical => "Technical indicators built from price and volume",
            Self::Fundamental => "Fundamental financial metrics",
            Self::Custom => "User-defined factor expressions",
        }
    }

    /// Lowercase name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Technical => "technical",
            Self::Fundamental => "fundamental",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for FactorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A factor definition of any category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", content = "definition", rename_all = "snake_case")]
pub enum FactorDefinition {
    /// Technical indicator.
    Technical(TechnicalFactor),
    /// Fundamental metric.
    Fundamental(FundamentalFactor),
    /// User expression.
    Custom(CustomFactor),
}

impl FactorDefinition {
    /// Category of the definition.
    pub const fn category(&self) -> FactorCategory {
        match self {
            Self::Technical(_) => FactorCategory::Technical,
            Self::Fundamental(_) => FactorCategory::Fundamental,
            Self::Custom(_) => FactorCategory::Custom,
        }
    }
}

impl FactorExpression for FactorDefinition {
    fn expression(&self) -> String {
        match self {
            Self::Technical(f) => f.expression(),
            Self::Fundamental(f) => f.expression(),
            Self::Custom(f) => f.expression(),
        }
    }

    fn description(&self) -> &str {
        match self {
            Self::Technical(f) => f.description(),
            Self::Fundamental(f) => f.description(),
            Self::Custom(f) => f.description(),
        }
    }
}

/// Keyed collection of factor definitions.
#[derive(Debug, Clone, Default)]
pub struct FactorRegistry {
    definitions: BTreeMap<String, FactorDefinition>,
}

impl FactorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in technical, fundamental and custom definition.
    pub fn builtin() -> Self {
        let mut definitions = BTreeMap::new();
        for (key, factor) in TechnicalFactor::builtin() {
            definitions.insert(key.to_string(), FactorDefinition::Technical(factor));
        }
        for (key, factor) in FundamentalFactor::builtin() {
            definitions.insert(key.to_string(), FactorDefinition::Fundamental(factor));
        }
        for factor in CustomFactor::builtin() {
            definitions.insert(factor.name().to_string(), FactorDefinition::Custom(factor));
        }
        Self { definitions }
    }

    /// Looks up a definition by key.
    ///
    /// # Errors
    ///
    /// Returns [`FactorLabError::FactorNotFound`] for an unknown key.
    pub fn get(&self, key: &str) -> Result<&FactorDefinition> {
        self.definitions
            .get(key)
            .ok_or_else(|| FactorLabError::FactorNotFound(key.to_string()))
    }

    /// Adds or replaces a custom definition under its own name.
    ///
    /// # Errors
    ///
    /// Replacing a technical or fundamental definition is a configuration
    /// error.
    pub fn register(&mut self, factor: CustomFactor) -> Result<()> {
        if let Some(existing) = self
            .definitions
            .get(factor.name())
            .filter(|def| def.category() != FactorCategory::Custom)
        {
            return Err(FactorLabError::config(format!(
                "'{}' is a built-in {} factor and cannot be redefined",
                factor.name(),
                existing.category()
            )));
        }
        self.definitions
            .insert(factor.name().to_string(), FactorDefinition::Custom(factor));
        Ok(())
    }

    /// All keys in order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.definitions.keys().map(String::as_str)
    }

    /// Iterates over `(key, definition)` in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FactorDefinition)> + '_ {
        self.definitions.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Definitions of one category.
    pub fn by_category(
        &self,
        category: FactorCategory,
    ) -> impl Iterator<Item = (&str, &FactorDefinition)> + '_ {
        self.iter().filter(move |(_, def)| def.category() == category)
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether the registry holds no definitions.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
