//! Panel columns and factor/return alignment.
//!
//! A [`PanelColumn`] holds one numeric field keyed by `(date, symbol)`. Factor
//! values and forward returns are both panel columns; [`align`] inner-joins
//! the two into an [`AlignedPanel`] that the IC and quantile engines consume.

use factorlab_traits::provider::CLOSE_FIELD;
use factorlab_traits::types::{DATE_COLUMN, SYMBOL_COLUMN};
use factorlab_traits::{
    DataProvider, DataRequest, Date, FactorLabError, MarketData, Result, Symbol,
};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Values of one field for every instrument observed on a date.
pub type CrossSection = BTreeMap<Symbol, f64>;

/// One named numeric field keyed by `(date, symbol)`.
///
/// Dates iterate in chronological order. Missing observations are either
/// absent or stored as NaN; both are excluded from cross-sectional work.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PanelColumn {
    name: String,
    data: BTreeMap<Date, CrossSection>,
}

/// A panel column holding factor scores.
pub type FactorSeries = PanelColumn;

/// A panel column holding forward holding-period returns.
pub type ReturnSeries = PanelColumn;

impl PanelColumn {
    /// Creates an empty column.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: BTreeMap::new(),
        }
    }

    /// Reads `column` out of a long-format frame.
    ///
    /// # Errors
    ///
    /// Fails if the key columns or `column` are missing, or if a
    /// `(date, symbol)` key appears twice.
    pub fn from_market_data(data: &MarketData, column: &str) -> Result<Self> {
        let dates = data.dates()?;
        let symbols = data.symbols()?;
        let values = data.values(column)?;

        let mut panel = Self::new(column);
        for ((date, symbol), value) in dates.into_iter().zip(symbols).zip(values) {
            if panel.insert(date, symbol.clone(), value).is_some() {
                return Err(FactorLabError::InvalidData(format!(
                    "duplicate entry for {symbol} on {date} in '{column}'"
                )));
            }
        }

        Ok(panel)
    }

    /// Builds a column from `(date, symbol, value)` triples. Later duplicates win.
    pub fn from_triples<I, S>(name: impl Into<String>, triples: I) -> Self
    where
        I: IntoIterator<Item = (Date, S, f64)>,
        S: Into<Symbol>,
    {
        let mut panel = Self::new(name);
        for (date, symbol, value) in triples {
            panel.insert(date, symbol.into(), value);
        }
        panel
    }

    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the same data under another name.
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets a value, returning the previous one.
    pub fn insert(&mut self, date: Date, symbol: Symbol, value: f64) -> Option<f64> {
        self.data.entry(date).or_default().insert(symbol, value)
    }

    /// Replaces the whole cross-section of a date.
    pub fn set_cross_section(&mut self, date: Date, values: CrossSection) {
        self.data.insert(date, values);
    }

    /// Value for a key, if present.
    pub fn get(&self, date: Date, symbol: &str) -> Option<f64> {
        self.data.get(&date).and_then(|cs| cs.get(symbol)).copied()
    }

    /// Cross-section of a date, if the date is present.
    pub fn cross_section(&self, date: Date) -> Option<&CrossSection> {
        self.data.get(&date)
    }

    /// Dates in chronological order.
    pub fn dates(&self) -> impl Iterator<Item = Date> + '_ {
        self.data.keys().copied()
    }

    /// Iterates over `(date, cross-section)` in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = (Date, &CrossSection)> + '_ {
        self.data.iter().map(|(date, cs)| (*date, cs))
    }

    /// Number of distinct dates.
    pub fn n_dates(&self) -> usize {
        self.data.len()
    }

    /// Number of stored `(date, symbol)` cells, missing values included.
    pub fn len(&self) -> usize {
        self.data.values().map(BTreeMap::len).sum()
    }

    /// Whether no cell is stored.
    pub fn is_empty(&self) -> bool {
        self.data.values().all(BTreeMap::is_empty)
    }

    /// Number of cells holding a finite value.
    pub fn count_finite(&self) -> usize {
        self.data
            .values()
            .flat_map(BTreeMap::values)
            .filter(|v| v.is_finite())
            .count()
    }

    /// Converts into a long-format `(date, symbol, <name>)` frame.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let capacity = self.len();
        let mut dates = Vec::with_capacity(capacity);
        let mut symbols = Vec::with_capacity(capacity);
        let mut values = Vec::with_capacity(capacity);

        for (date, cs) in self.iter() {
            for (symbol, value) in cs {
                dates.push(date);
                symbols.push(symbol.as_str());
                values.push(*value);
            }
        }

        Ok(DataFrame::new(vec![
            Column::new(DATE_COLUMN.into(), dates),
            Column::new(SYMBOL_COLUMN.into(), symbols),
            Column::new(self.name.as_str().into(), values),
        ])?)
    }
}

/// Derives forward returns from a close price column.
///
/// For each instrument, ordered by date, the return stored at observation `t`
/// is `p[t + horizon] / p[t] - 1`. The last `horizon` observations of each
/// instrument have no future price and are omitted. A non-finite or zero
/// starting price yields NaN.
///
/// # Errors
///
/// A zero horizon is a configuration error.
pub fn forward_returns(prices: &PanelColumn, horizon: usize) -> Result<ReturnSeries> {
    if horizon == 0 {
        return Err(FactorLabError::config("forward return horizon must be at least 1"));
    }

    let mut by_symbol: BTreeMap<&str, Vec<(Date, f64)>> = BTreeMap::new();
    for (date, cs) in prices.iter() {
        for (symbol, price) in cs {
            by_symbol.entry(symbol.as_str()).or_default().push((date, *price));
        }
    }

    let mut returns = PanelColumn::new(format!("forward_return_{horizon}"));
    for (symbol, history) in by_symbol {
        for (i, &(date, start)) in history.iter().enumerate() {
            let Some(&(_, end)) = history.get(i + horizon) else {
                break;
            };
            let value = if start.is_finite() && end.is_finite() && start != 0.0 {
                end / start - 1.0
            } else {
                f64::NAN
            };
            returns.insert(date, symbol.to_string(), value);
        }
    }

    Ok(returns)
}

/// Fetches a factor panel and close prices and derives forward returns.
///
/// Returns the factor column named after `field` and the forward return
/// column for `horizon` periods.
pub fn load_inputs<P>(
    provider: &P,
    request: &DataRequest,
    field: &str,
    horizon: usize,
) -> Result<(FactorSeries, ReturnSeries)>
where
    P: DataProvider + ?Sized,
{
    let factor = PanelColumn::from_market_data(&provider.get_panel(request, &[field])?, field)?;
    let prices = PanelColumn::from_market_data(&provider.get_prices(request)?, CLOSE_FIELD)?;
    let returns = forward_returns(&prices, horizon)?;
    Ok((factor, returns))
}

/// One instrument's factor value and forward return on a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelRow {
    /// Instrument identifier.
    pub symbol: Symbol,
    /// Factor value, always finite.
    pub factor: f64,
    /// Forward return, always finite.
    pub forward_return: f64,
}

/// Factor values inner-joined with forward returns.
///
/// Only keys present and finite in both inputs are kept. Dates with no
/// surviving rows are dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignedPanel {
    factor_name: String,
    rows: BTreeMap<Date, Vec<PanelRow>>,
}

impl AlignedPanel {
    /// Name of the factor column.
    pub fn factor_name(&self) -> &str {
        &self.factor_name
    }

    /// Iterates over `(date, rows)` in chronological order.
    pub fn cross_sections(&self) -> impl Iterator<Item = (Date, &[PanelRow])> + '_ {
        self.rows.iter().map(|(date, rows)| (*date, rows.as_slice()))
    }

    /// Rows of a single date.
    pub fn rows_on(&self, date: Date) -> &[PanelRow] {
        self.rows.get(&date).map_or(&[], Vec::as_slice)
    }

    /// Dates in chronological order.
    pub fn dates(&self) -> Vec<Date> {
        self.rows.keys().copied().collect()
    }

    /// Number of distinct dates.
    pub fn n_dates(&self) -> usize {
        self.rows.len()
    }

    /// Total number of rows.
    pub fn n_rows(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }

    /// Whether the join produced no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Converts into a long-format `(date, symbol, factor, forward_return)` frame.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let mut dates = Vec::with_capacity(self.n_rows());
        let mut symbols = Vec::with_capacity(self.n_rows());
        let mut factors = Vec::with_capacity(self.n_rows());
        let mut returns = Vec::with_capacity(self.n_rows());

        for (date, rows) in self.cross_sections() {
            for row in rows {
                dates.push(date);
                symbols.push(row.symbol.as_str());
                factors.push(row.factor);
                returns.push(row.forward_return);
            }
        }

        Ok(DataFrame::new(vec![
            Column::new(DATE_COLUMN.into(), dates),
            Column::new(SYMBOL_COLUMN.into(), symbols),
            Column::new(self.factor_name.as_str().into(), factors),
            Column::new("forward_return".into(), returns),
        ])?)
    }
}

/// Inner-joins a factor column with a forward return column.
///
/// No interpolation or forward-fill happens. Disjoint inputs give an empty
/// panel rather than an error.
pub fn align(factor: &FactorSeries, returns: &ReturnSeries) -> AlignedPanel {
    let mut rows = BTreeMap::new();

    for (date, factor_cs) in factor.iter() {
        let Some(return_cs) = returns.cross_section(date) else {
            continue;
        };

        let joined: Vec<PanelRow> = factor_cs
            .iter()
            .filter(|(_, f)| f.is_finite())
            .filter_map(|(symbol, &f)| {
                return_cs
                    .get(symbol)
                    .filter(|r| r.is_finite())
                    .map(|&r| PanelRow {
                        symbol: symbol.clone(),
                        factor: f,
                        forward_return: r,
                    })
            })
            .collect();

        if !joined.is_empty() {
            rows.insert(date, joined);
        }
    }

    AlignedPanel {
        factor_name: factor.name().to_string(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use factorlab_traits::{InMemoryProvider, Universe};

    fn d(day: u32) -> Date {
        Date::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_from_market_data() {
        let df = df! {
            "date" => &["2024-01-02", "2024-01-02", "2024-01-03"],
            "symbol" => &["A", "B", "A"],
            "value" => &[Some(1.0), None, Some(2.0)],
        }
        .unwrap();
        let panel = PanelColumn::from_market_data(&MarketData::new(df), "value").unwrap();

        assert_eq!(panel.name(), "value");
        assert_eq!(panel.n_dates(), 2);
        assert_eq!(panel.len(), 3);
        assert_eq!(panel.count_finite(), 2);
        assert_eq!(panel.get(d(3), "A"), Some(2.0));
        assert!(panel.get(d(2), "B").is_some_and(f64::is_nan));
    }

    #[test]
    fn test_from_market_data_rejects_duplicates() {
        let df = df! {
            "date" => &["2024-01-02", "2024-01-02"],
            "symbol" => &["A", "A"],
            "value" => &[1.0, 2.0],
        }
        .unwrap();
        assert!(matches!(
            PanelColumn::from_market_data(&MarketData::new(df), "value"),
            Err(FactorLabError::InvalidData(_))
        ));
    }

    #[test]
    fn test_forward_returns() {
        let prices = PanelColumn::from_triples(
            "close",
            vec![
                (d(1), "A", 100.0),
                (d(2), "A", 110.0),
                (d(3), "A", 99.0),
                (d(1), "B", 50.0),
                (d(2), "B", 50.0),
            ],
        );

        let returns = forward_returns(&prices, 1).unwrap();
        assert_abs_diff_eq!(returns.get(d(1), "A").unwrap(), 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(returns.get(d(2), "A").unwrap(), -0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(returns.get(d(1), "B").unwrap(), 0.0, epsilon = 1e-12);
        // Last observation of each instrument has no future price.
        assert_eq!(returns.get(d(3), "A"), None);
        assert_eq!(returns.get(d(2), "B"), None);

        let two_day = forward_returns(&prices, 2).unwrap();
        assert_abs_diff_eq!(two_day.get(d(1), "A").unwrap(), -0.01, epsilon = 1e-12);
        assert_eq!(two_day.len(), 1);
    }

    #[test]
    fn test_forward_returns_zero_horizon() {
        let err = forward_returns(&PanelColumn::new("close"), 0).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_align_inner_join() {
        let factor = PanelColumn::from_triples(
            "f",
            vec![
                (d(1), "A", 1.0),
                (d(1), "B", f64::NAN),
                (d(1), "C", 3.0),
                (d(2), "A", 1.0),
            ],
        );
        let returns = PanelColumn::from_triples(
            "r",
            vec![
                (d(1), "A", 0.01),
                (d(1), "B", 0.02),
                (d(1), "C", f64::NAN),
                (d(3), "A", 0.01),
            ],
        );

        let panel = align(&factor, &returns);
        assert_eq!(panel.n_dates(), 1);
        assert_eq!(panel.n_rows(), 1);
        assert_eq!(panel.rows_on(d(1))[0].symbol, "A");
        assert!(panel.rows_on(d(2)).is_empty());
    }

    #[test]
    fn test_align_no_overlap_is_empty() {
        let factor = PanelColumn::from_triples("f", vec![(d(1), "A", 1.0)]);
        let returns = PanelColumn::from_triples("r", vec![(d(2), "A", 0.01)]);
        let panel = align(&factor, &returns);
        assert!(panel.is_empty());
        assert_eq!(panel.factor_name(), "f");
    }

    #[test]
    fn test_to_frame() {
        let factor = PanelColumn::from_triples("f", vec![(d(1), "A", 1.0), (d(1), "B", 2.0)]);
        let frame = factor.to_frame().unwrap();
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.width(), 3);

        let returns = PanelColumn::from_triples("r", vec![(d(1), "A", 0.1), (d(1), "B", 0.2)]);
        let aligned = align(&factor, &returns).to_frame().unwrap();
        assert_eq!(aligned.height(), 2);
        assert!(aligned.column("forward_return").is_ok());
    }

    #[test]
    fn test_load_inputs() {
        let df = df! {
            "date" => &["2024-01-01", "2024-01-01", "2024-01-02", "2024-01-02"],
            "symbol" => &["A", "B", "A", "B"],
            "close" => &[10.0, 20.0, 11.0, 19.0],
            "value" => &[1.0, 2.0, 1.5, 2.5],
        }
        .unwrap();
        let provider = InMemoryProvider::new(MarketData::new(df));
        let request = DataRequest::new(Universe::default(), d(1), d(2));

        let (factor, returns) = load_inputs(&provider, &request, "value", 1).unwrap();
        assert_eq!(factor.len(), 4);
        assert_eq!(returns.len(), 2);
        assert_abs_diff_eq!(returns.get(d(1), "B").unwrap(), -0.05, epsilon = 1e-12);
    }
}
