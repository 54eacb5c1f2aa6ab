//! Quantile-sorted portfolios.
//!
//! Every date, instruments are cut into `n_groups` buckets by empirical
//! quantiles of their factor value and each bucket earns the mean forward
//! return of its members. Bucket 0 holds the lowest factor values and bucket
//! `n_groups - 1` the highest.
//!
//! Duplicate cut points collapse buckets, so a date may end up with fewer
//! buckets than requested. Bucket labels stay contiguous from 0, which leaves
//! the highest columns of that row missing. Missing cells are kept as `None`
//! in the [`GroupReturnMatrix`] and contribute a zero return when compounding.

use crate::metrics::{cumulative_returns, position_turnover};
use crate::panel::{AlignedPanel, PanelRow};
use factorlab_traits::stats::quantile_sorted;
use factorlab_traits::types::DATE_COLUMN;
use factorlab_traits::{Date, FactorLabError, Result, Symbol, TimeSeries};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default number of quantile buckets.
pub const DEFAULT_N_GROUPS: usize = 5;

/// Assigns each value to a quantile bucket.
///
/// Cut points are the empirical quantiles at `i / n_groups`. Duplicate cut
/// points are dropped and bucket labels are renumbered contiguously. Bins are
/// right-closed, the first one also including the minimum. Returns the labels
/// and the number of effective buckets.
///
/// All values are expected to be finite. Identical values all land in
/// bucket 0.
pub fn quantile_buckets(values: &[f64], n_groups: usize) -> (Vec<usize>, usize) {
    if values.is_empty() || n_groups == 0 {
        return (Vec::new(), 0);
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut edges: Vec<f64> = (0..=n_groups)
        .map(|i| quantile_sorted(&sorted, i as f64 / n_groups as f64))
        .collect();
    edges.dedup();

    let n_buckets = edges.len().saturating_sub(1).max(1);
    let upper_edges = &edges[1..];

    let labels = values
        .iter()
        .map(|&v| upper_edges.partition_point(|&edge| edge < v).min(n_buckets - 1))
        .collect();

    (labels, n_buckets)
}

/// Mean forward return per bucket, by date.
///
/// Rows are dates in chronological order, columns are buckets `0..n_groups`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupReturnMatrix {
    n_groups: usize,
    dates: Vec<Date>,
    cells: Vec<Vec<Option<f64>>>,
}

impl GroupReturnMatrix {
    /// Creates an empty matrix.
    pub const fn new(n_groups: usize) -> Self {
        Self {
            n_groups,
            dates: Vec::new(),
            cells: Vec::new(),
        }
    }

    /// Appends a row. Missing trailing cells are padded with `None`.
    pub fn push_row(&mut self, date: Date, mut row: Vec<Option<f64>>) {
        row.resize(self.n_groups, None);
        self.dates.push(date);
        self.cells.push(row);
    }

    /// Number of bucket columns.
    pub const fn n_groups(&self) -> usize {
        self.n_groups
    }

    /// Row dates.
    pub fn dates(&self) -> &[Date] {
        &self.dates
    }

    /// Number of rows.
    pub fn n_dates(&self) -> usize {
        self.dates.len()
    }

    /// Whether the matrix has no rows.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Cell at `(row, group)`.
    pub fn get(&self, row: usize, group: usize) -> Option<f64> {
        self.cells.get(row).and_then(|r| r.get(group).copied().flatten())
    }

    /// A bucket's column, `None` where the bucket was empty.
    pub fn column(&self, group: usize) -> Vec<Option<f64>> {
        self.cells
            .iter()
            .map(|row| row.get(group).copied().flatten())
            .collect()
    }

    /// A bucket's column with missing cells as zero returns.
    pub fn filled_column(&self, group: usize) -> Vec<f64> {
        self.column(group)
            .into_iter()
            .map(|cell| cell.unwrap_or(0.0))
            .collect()
    }

    /// Long-short spread per date: highest bucket minus lowest bucket.
    ///
    /// A date on which either end bucket is missing has a zero spread. The end
    /// columns are not zero-filled first, so a missing top bucket does not turn
    /// into a short position in the bottom bucket.
    pub fn long_short(&self) -> Vec<f64> {
        let top = self.n_groups.saturating_sub(1);
        self.cells
            .iter()
            .map(|row| match (row.get(top).copied().flatten(), row.first().copied().flatten()) {
                (Some(high), Some(low)) => high - low,
                _ => 0.0,
            })
            .collect()
    }

    /// Wide frame with a `date` column and one `group_<i>` column per bucket.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(self.n_groups + 1);
        columns.push(Column::new(DATE_COLUMN.into(), self.dates.clone()));
        for group in 0..self.n_groups {
            columns.push(Column::new(
                format!("group_{group}").as_str().into(),
                self.column(group),
            ));
        }
        Ok(DataFrame::new(columns)?)
    }
}

/// Output of [`group_backtest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupBacktest {
    /// Per-date bucket mean returns.
    pub returns: GroupReturnMatrix,
    /// Compounded curve of each bucket, zero-filling missing cells.
    pub cumulative: Vec<TimeSeries>,
    /// Per-date long-short spread.
    pub long_short: TimeSeries,
    /// Compounded long-short curve.
    pub long_short_cumulative: TimeSeries,
    /// Per-date turnover of the equal-weight long-short book.
    pub turnover: TimeSeries,
    /// Dates on which fewer than `n_groups` buckets could be formed.
    pub collapsed_dates: usize,
}

impl GroupBacktest {
    /// Mean per-date long-short turnover, 0 when there are no dates.
    pub fn mean_turnover(&self) -> f64 {
        if self.turnover.is_empty() {
            0.0
        } else {
            self.turnover.values().iter().sum::<f64>() / self.turnover.len() as f64
        }
    }
}

/// Bucket labels and the effective bucket count for one cross-section.
pub fn assign_groups(rows: &[PanelRow], n_groups: usize) -> (Vec<usize>, usize) {
    let factor: Vec<f64> = rows.iter().map(|r| r.factor).collect();
    quantile_buckets(&factor, n_groups)
}

/// Runs the quantile portfolio engine over every date of the panel.
///
/// # Errors
///
/// Fewer than two buckets is a configuration error.
pub fn group_backtest(panel: &AlignedPanel, n_groups: usize) -> Result<GroupBacktest> {
    if n_groups < 2 {
        return Err(FactorLabError::config(format!(
            "n_groups must be at least 2, got {n_groups}"
        )));
    }

    let mut matrix = GroupReturnMatrix::new(n_groups);
    let mut books: Vec<BTreeMap<Symbol, f64>> = Vec::with_capacity(panel.n_dates());
    let mut collapsed_dates = 0;

    for (date, rows) in panel.cross_sections() {
        let (labels, n_buckets) = assign_groups(rows, n_groups);
        if n_buckets < n_groups {
            collapsed_dates += 1;
        }

        let mut sums = vec![0.0; n_groups];
        let mut counts = vec![0usize; n_groups];
        for (row, &label) in rows.iter().zip(&labels) {
            sums[label] += row.forward_return;
            counts[label] += 1;
        }

        let means: Vec<Option<f64>> = sums
            .iter()
            .zip(&counts)
            .map(|(&sum, &count)| (count > 0).then_some(sum / count as f64))
            .collect();
        matrix.push_row(date, means);

        books.push(long_short_book(rows, &labels, &counts, n_groups));
    }

    let dates = matrix.dates().to_vec();
    let cumulative = (0..n_groups)
        .map(|group| {
            let curve = cumulative_returns(&matrix.filled_column(group));
            TimeSeries::from_parts(format!("group_{group}"), dates.clone(), curve)
        })
        .collect::<Result<Vec<_>>>()?;

    let spread = matrix.long_short();
    let long_short_cumulative =
        TimeSeries::from_parts("long_short_cumulative", dates.clone(), cumulative_returns(&spread))?;
    let long_short = TimeSeries::from_parts("long_short", dates.clone(), spread)?;
    let turnover = TimeSeries::from_parts("turnover", dates, position_turnover(&books))?;

    Ok(GroupBacktest {
        returns: matrix,
        cumulative,
        long_short,
        long_short_cumulative,
        turnover,
        collapsed_dates,
    })
}

/// Equal-weight long the top bucket, equal-weight short the bottom bucket.
///
/// Empty when either end bucket is missing, matching the zero spread.
fn long_short_book(
    rows: &[PanelRow],
    labels: &[usize],
    counts: &[usize],
    n_groups: usize,
) -> BTreeMap<Symbol, f64> {
    let top = n_groups - 1;
    if counts[0] == 0 || counts[top] == 0 {
        return BTreeMap::new();
    }

    let long_weight = 1.0 / counts[top] as f64;
    let short_weight = -1.0 / counts[0] as f64;

    rows.iter()
        .zip(labels)
        .filter_map(|(row, &label)| match label {
            l if l == top => Some((row.symbol.clone(), long_weight)),
            0 => Some((row.symbol.clone(), short_weight)),
            _ => None,
        })
        .collect()
}
