//! Data loading utilities for the factorlab CLI.

use chrono::NaiveDate;
use factorlab_traits::{
    DataRequest, FactorLabError, InMemoryProvider, MarketData, Universe,
};
use polars::prelude::*;
use std::path::Path;

/// Load a long-format panel from a CSV file.
///
/// The file needs `date` (YYYY-MM-DD), `symbol` and `close` columns plus one
/// numeric column per factor.
pub(crate) fn load_market_data(path: &Path) -> Result<MarketData, FactorLabError> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    if df.is_empty() {
        return Err(FactorLabError::InvalidData(format!(
            "{} contains no rows",
            path.display()
        )));
    }

    Ok(MarketData::new(df))
}

/// Parse a date string in YYYY-MM-DD format.
pub(crate) fn parse_date(date_str: &str) -> Result<NaiveDate, FactorLabError> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|e| FactorLabError::InvalidDate(format!("{date_str}: {e}")))
}

/// Builds a request over the provider's data, narrowed by optional bounds.
///
/// `symbols` restricts the universe when non-empty.
pub(crate) fn build_request(
    provider: &InMemoryProvider,
    symbols: &[String],
    start: Option<&str>,
    end: Option<&str>,
) -> Result<DataRequest, FactorLabError> {
    let (first, last) = provider
        .date_range()?
        .ok_or_else(|| FactorLabError::InsufficientData("panel has no dates".to_string()))?;

    let start = start.map(parse_date).transpose()?.unwrap_or(first);
    let end = end.map(parse_date).transpose()?.unwrap_or(last);
    let universe = if symbols.is_empty() {
        Universe::default()
    } else {
        Universe::Symbols(symbols.to_vec())
    };

    let request = DataRequest::new(universe, start, end);
    request.validate()?;
    Ok(request)
}
