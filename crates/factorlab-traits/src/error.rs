//! Error types for factorlab.
//!
//! Structural and configuration problems surface as [`FactorLabError`]. Per-date
//! numerical degeneracies (too few instruments, zero variance) are not errors:
//! the engines absorb them into NaN or zero sentinels and keep going.

use thiserror::Error;

/// The main error type for factorlab operations.
#[derive(Debug, Error)]
pub enum FactorLabError {
    /// An explicitly supplied configuration value is invalid.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A weighted factor has no input series.
    #[error("Missing factor input: {0}")]
    MissingFactor(String),

    /// Error due to invalid or malformed data.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Error when a required column is missing from the data.
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// Error from Polars operations.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Error when data is insufficient for the requested operation.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Error when a date is out of range or invalid.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Error fetching data from a data provider.
    #[error("Data fetch error: {0}")]
    DataFetch(String),

    /// Error when a factor definition is not registered.
    #[error("Factor not found: {0}")]
    FactorNotFound(String),

    /// Generic error for other cases.
    #[error("Error: {0}")]
    Other(String),
}

impl FactorLabError {
    /// Shorthand for a [`FactorLabError::Configuration`] error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Returns true for errors caused by the caller's configuration.
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::MissingFactor(_))
    }
}

impl From<String> for FactorLabError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<&str> for FactorLabError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

/// A specialized Result type for factorlab operations.
pub type Result<T> = std::result::Result<T, FactorLabError>;
