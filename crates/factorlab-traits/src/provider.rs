//! Data provider interface.
//!
//! The engines never fetch data themselves. A [`DataProvider`] answers panel
//! queries by universe, field list, date range and frequency, and the caller
//! hands the results to the engines. [`InMemoryProvider`] serves queries from
//! a frame already in memory, which is what tests and the CLI use.

use crate::{Date, FactorLabError, MarketData, Result, Symbol};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Name of the close price field returned by [`DataProvider::get_prices`].
pub const CLOSE_FIELD: &str = "close";

/// The set of instruments a query covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Universe {
    /// A provider-defined universe such as `"csi300"`.
    Named(String),
    /// An explicit instrument list.
    Symbols(Vec<Symbol>),
}

impl Universe {
    /// Whether the instrument belongs to this universe.
    ///
    /// Named universes are resolved by the provider, so every instrument
    /// matches here.
    pub fn contains(&self, symbol: &str) -> bool {
        match self {
            Self::Named(_) => true,
            Self::Symbols(symbols) => symbols.iter().any(|s| s == symbol),
        }
    }
}

impl Default for Universe {
    fn default() -> Self {
        Self::Named("all".to_string())
    }
}

/// Sampling frequency of a panel query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    /// One observation per trading day.
    #[default]
    Daily,
    /// One observation per week.
    Weekly,
    /// One observation per month.
    Monthly,
}

impl Frequency {
    /// Conventional number of periods per year.
    pub const fn periods_per_year(self) -> usize {
        match self {
            Self::Daily => 252,
            Self::Weekly => 52,
            Self::Monthly => 12,
        }
    }

    /// Lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = FactorLabError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "day" | "d" => Ok(Self::Daily),
            "weekly" | "week" | "w" => Ok(Self::Weekly),
            "monthly" | "month" | "m" => Ok(Self::Monthly),
            other => Err(FactorLabError::config(format!("unknown frequency '{other}'"))),
        }
    }
}

/// A panel query: which instruments, over which inclusive date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRequest {
    /// Instruments to cover.
    pub universe: Universe,
    /// First date, inclusive.
    pub start: Date,
    /// Last date, inclusive.
    pub end: Date,
    /// Sampling frequency.
    #[serde(default)]
    pub frequency: Frequency,
}

impl DataRequest {
    /// Creates a daily request.
    pub const fn new(universe: Universe, start: Date, end: Date) -> Self {
        Self {
            universe,
            start,
            end,
            frequency: Frequency::Daily,
        }
    }

    /// Sets the sampling frequency.
    pub const fn with_frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = frequency;
        self
    }

    /// Rejects inverted date ranges.
    pub fn validate(&self) -> Result<()> {
        if self.start > self.end {
            return Err(FactorLabError::config(format!(
                "start date {} is after end date {}",
                self.start, self.end
            )));
        }
        Ok(())
    }

    /// Whether a `(date, symbol)` key falls inside this request.
    pub fn covers(&self, date: Date, symbol: &str) -> bool {
        date >= self.start && date <= self.end && self.universe.contains(symbol)
    }
}

/// Source of panel data keyed by `(date, symbol)`.
///
/// Implementations are expected to be synchronous; any I/O completes before
/// the engines run.
pub trait DataProvider: Send + Sync {
    /// Returns the requested fields for every covered `(date, symbol)` key.
    ///
    /// The frame holds the `date` and `symbol` columns followed by one column
    /// per field.
    ///
    /// # Errors
    ///
    /// Returns an error if a field is unknown or the fetch fails.
    fn get_panel(&self, request: &DataRequest, fields: &[&str]) -> Result<MarketData>;

    /// Returns close prices for every covered `(date, symbol)` key.
    ///
    /// The price column is named [`CLOSE_FIELD`].
    fn get_prices(&self, request: &DataRequest) -> Result<MarketData> {
        self.get_panel(request, &[CLOSE_FIELD])
    }
}

/// A provider serving queries from an in-memory long-format frame.
#[derive(Debug, Clone)]
pub struct InMemoryProvider {
    data: MarketData,
}

impl InMemoryProvider {
    /// Wraps a frame with `date`, `symbol` and field columns.
    pub const fn new(data: MarketData) -> Self {
        Self { data }
    }

    /// The full underlying frame.
    pub const fn data(&self) -> &MarketData {
        &self.data
    }

    /// Distinct instruments present in the frame.
    pub fn symbols(&self) -> Result<Vec<Symbol>> {
        let unique: BTreeSet<Symbol> = self.data.symbols()?.into_iter().collect();
        Ok(unique.into_iter().collect())
    }

    /// Earliest and latest dates present, if any.
    pub fn date_range(&self) -> Result<Option<(Date, Date)>> {
        let dates = self.data.dates()?;
        let first = dates.iter().min().copied();
        let last = dates.iter().max().copied();
        Ok(first.zip(last))
    }
}

impl DataProvider for InMemoryProvider {
    fn get_panel(&self, request: &DataRequest, fields: &[&str]) -> Result<MarketData> {
        request.validate()?;
        if request.frequency != Frequency::Daily {
            return Err(FactorLabError::DataFetch(format!(
                "in-memory provider only serves daily data, got {}",
                request.frequency
            )));
        }

        self.data
            .select_fields(fields)?
            .filter_rows(|date, symbol| request.covers(date, symbol))
    }
}
