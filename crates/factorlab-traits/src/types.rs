//! Common types used throughout factorlab.
//!
//! This module defines the panel-shaped market data container handed over by
//! data providers, the instrument and date aliases, and a simple dated series
//! used for IC and return curves.

use crate::{FactorLabError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

// Re-export date type from chrono
pub use chrono::NaiveDate as Date;

/// An opaque instrument identifier, e.g. `"SH600000"` or `"AAPL"`.
pub type Symbol = String;

/// Days between 0001-01-01 (chrono's CE day 1) and the Unix epoch.
///
/// Polars stores `Date` values as days since the Unix epoch.
pub const CE_TO_UNIX_EPOCH_DAYS: i32 = 719_163;

/// Name of the date column in a panel frame.
pub const DATE_COLUMN: &str = "date";

/// Name of the instrument column in a panel frame.
pub const SYMBOL_COLUMN: &str = "symbol";

/// Converts a Polars physical date (days since the Unix epoch) to a [`Date`].
pub fn date_from_epoch_days(days: i32) -> Option<Date> {
    Date::from_num_days_from_ce_opt(days + CE_TO_UNIX_EPOCH_DAYS)
}

/// Container for panel-shaped market data.
///
/// `MarketData` wraps a Polars DataFrame in long format: one row per
/// `(date, symbol)` key and one column per field.
///
/// # Expected Schema
///
/// - `date`: trading date (`Date`, `Datetime` or `YYYY-MM-DD` strings)
/// - `symbol`: instrument identifier
/// - any number of numeric field columns (`close`, factor values, ...)
///
/// # Example
///
/// ```no_run
/// use factorlab_traits::MarketData;
/// use polars::prelude::*;
///
/// let df = df! {
///     "date" => &["2024-01-02", "2024-01-02"],
///     "symbol" => &["AAPL", "MSFT"],
///     "close" => &[150.0, 300.0],
/// }.unwrap();
///
/// let market_data = MarketData::new(df);
/// ```
#[derive(Debug, Clone)]
pub struct MarketData {
    /// The underlying DataFrame containing market data.
    data: DataFrame,
}

impl MarketData {
    /// Creates a new `MarketData` instance from a DataFrame.
    pub const fn new(data: DataFrame) -> Self {
        Self { data }
    }

    /// Returns a reference to the underlying DataFrame.
    pub const fn data(&self) -> &DataFrame {
        &self.data
    }

    /// Consumes self and returns the underlying DataFrame.
    pub fn into_inner(self) -> DataFrame {
        self.data
    }

    /// Returns the number of rows in the market data.
    pub fn len(&self) -> usize {
        self.data.height()
    }

    /// Returns whether the market data is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the column names in the market data.
    pub fn columns(&self) -> Vec<String> {
        self.data
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Checks if a column exists in the market data.
    pub fn has_column(&self, name: &str) -> bool {
        self.data
            .get_column_names()
            .iter()
            .any(|s| s.as_str() == name)
    }

    /// Gets a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.data.column(name).ok()
    }

    /// Gets a column by name, failing with [`FactorLabError::MissingColumn`].
    pub fn require_column(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| FactorLabError::MissingColumn(name.to_string()))
    }

    /// Returns the `date` column as calendar dates, one per row.
    ///
    /// Accepts `Date`, `Datetime` and `YYYY-MM-DD` string columns.
    pub fn dates(&self) -> Result<Vec<Date>> {
        let series = self.require_column(DATE_COLUMN)?.as_materialized_series();

        match series.dtype() {
            DataType::String => series
                .str()?
                .into_iter()
                .map(|s: Option<&str>| {
                    let s = s.ok_or_else(|| {
                        FactorLabError::InvalidDate("null value in date column".to_string())
                    })?;
                    Date::parse_from_str(s.trim(), "%Y-%m-%d")
                        .map_err(|e| FactorLabError::InvalidDate(format!("{s}: {e}")))
                })
                .collect(),
            DataType::Date | DataType::Datetime(_, _) => {
                let dates = series.cast(&DataType::Date)?;
                dates
                    .date()?
                    .into_iter()
                    .map(|d: Option<i32>| {
                        d.and_then(date_from_epoch_days).ok_or_else(|| {
                            FactorLabError::InvalidDate("null value in date column".to_string())
                        })
                    })
                    .collect()
            }
            other => Err(FactorLabError::InvalidData(format!(
                "unsupported date column type: {other}"
            ))),
        }
    }

    /// Returns the `symbol` column, one identifier per row.
    pub fn symbols(&self) -> Result<Vec<Symbol>> {
        let series = self
            .require_column(SYMBOL_COLUMN)?
            .as_materialized_series()
            .cast(&DataType::String)?;

        series
            .str()?
            .into_iter()
            .map(|s: Option<&str>| {
                s.map(str::to_string).ok_or_else(|| {
                    FactorLabError::InvalidData("null value in symbol column".to_string())
                })
            })
            .collect()
    }

    /// Returns a numeric column as `f64`, with nulls mapped to NaN.
    pub fn values(&self, name: &str) -> Result<Vec<f64>> {
        let series = self
            .require_column(name)?
            .as_materialized_series()
            .cast(&DataType::Float64)?;

        Ok(series
            .f64()?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect())
    }

    /// Keeps only the rows for which `keep(date, symbol)` returns true.
    pub fn filter_rows<F>(&self, keep: F) -> Result<Self>
    where
        F: Fn(Date, &str) -> bool,
    {
        let dates = self.dates()?;
        let symbols = self.symbols()?;

        let mask = dates
            .iter()
            .zip(symbols.iter())
            .map(|(date, symbol)| keep(*date, symbol))
            .collect::<BooleanChunked>();

        Ok(Self::new(self.data.filter(&mask)?))
    }

    /// Projects the frame onto the key columns plus the given fields.
    pub fn select_fields(&self, fields: &[&str]) -> Result<Self> {
        for field in fields {
            self.require_column(field)?;
        }

        let mut columns = vec![DATE_COLUMN, SYMBOL_COLUMN];
        columns.extend(fields.iter().copied());

        Ok(Self::new(self.data.select(columns)?))
    }
}

impl From<DataFrame> for MarketData {
    fn from(data: DataFrame) -> Self {
        Self::new(data)
    }
}

impl AsRef<DataFrame> for MarketData {
    fn as_ref(&self) -> &DataFrame {
        &self.data
    }
}

/// A named series of values indexed by date, in chronological order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    name: String,
    dates: Vec<Date>,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Creates an empty series.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dates: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Builds a series from parallel date and value vectors.
    pub fn from_parts(name: impl Into<String>, dates: Vec<Date>, values: Vec<f64>) -> Result<Self> {
        if dates.len() != values.len() {
            return Err(FactorLabError::InvalidData(format!(
                "series has {} dates but {} values",
                dates.len(),
                values.len()
            )));
        }

        Ok(Self {
            name: name.into(),
            dates,
            values,
        })
    }

    /// Appends an observation. Dates are expected in ascending order.
    pub fn push(&mut self, date: Date, value: f64) {
        self.dates.push(date);
        self.values.push(value);
    }

    /// Series name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Observation dates.
    pub fn dates(&self) -> &[Date] {
        &self.dates
    }

    /// Observation values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series has no observations.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over `(date, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Date, f64)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }

    /// The most recent observation, if any.
    pub fn last(&self) -> Option<(Date, f64)> {
        self.iter().last()
    }

    /// Values that are neither NaN nor infinite.
    pub fn finite_values(&self) -> Vec<f64> {
        self.values.iter().copied().filter(|v| v.is_finite()).collect()
    }

    /// Converts the series into a two-column `(date, <name>)` DataFrame.
    pub fn to_frame(&self) -> Result<DataFrame> {
        Ok(DataFrame::new(vec![
            Column::new(DATE_COLUMN.into(), self.dates.clone()),
            Column::new(self.name.as_str().into(), self.values.clone()),
        ])?)
    }
}
