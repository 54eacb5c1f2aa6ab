//! Statistical utility functions for cross-sectional processing.
//!
//! All helpers ignore non-finite inputs when estimating statistics, so a NaN
//! factor value excludes that instrument from the cross-section without
//! contaminating the rest of it.

/// Relative tolerance, in machine epsilons of the mean, below which a
/// standard deviation is rounding noise and counts as zero.
pub const STD_TOLERANCE_EPSILONS: f64 = 16.0;

/// Z-score standardization result containing computed statistics.
#[derive(Debug, Clone, Copy)]
pub struct StandardizeResult {
    /// The computed mean of the finite input values.
    pub mean: f64,
    /// The computed sample standard deviation (N-1 denominator).
    pub std: f64,
    /// Whether the standardization was applied (false if variance was too low).
    pub applied: bool,
}

/// Arithmetic mean of the finite values, NaN if there are none.
pub fn mean(values: &[f64]) -> f64 {
    let (sum, n) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));

    if n == 0 { f64::NAN } else { sum / n as f64 }
}

/// Sample standard deviation (N-1 denominator) of the finite values.
///
/// Returns NaN when fewer than two finite values are available and exactly 0
/// when they are all equal.
pub fn sample_std(values: &[f64]) -> f64 {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.len() < 2 {
        return f64::NAN;
    }
    if finite.iter().all(|&v| v == finite[0]) {
        return 0.0;
    }

    let m = finite.iter().sum::<f64>() / finite.len() as f64;
    let variance = finite.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (finite.len() - 1) as f64;
    variance.sqrt()
}

/// Whether `std` is undefined, zero, or rounding noise relative to `mean`.
///
/// The tolerance scales with the mean only, so a cross-section that is small
/// in absolute terms but genuinely dispersed is not degenerate.
///
/// ```
/// use factorlab_traits::stats::is_degenerate_std;
///
/// assert!(is_degenerate_std(0.0, 0.0));
/// assert!(is_degenerate_std(1.7e-17, 0.1));
/// assert!(!is_degenerate_std(1.29e-11, 2.5e-11));
/// ```
pub fn is_degenerate_std(std: f64, mean: f64) -> bool {
    !std.is_finite() || std <= f64::EPSILON * STD_TOLERANCE_EPSILONS * mean.abs()
}

/// Empirical quantile of an ascending-sorted slice using linear interpolation.
///
/// `q` is clamped to `[0, 1]`. Returns NaN for an empty slice.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }

    let q = q.clamp(0.0, 1.0);
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;

    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Empirical quantile of the finite values in an unsorted slice.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, q)
}

/// Clips every finite value into `[lower, upper]`, leaving NaN untouched.
///
/// A non-finite bound disables clipping on that side.
pub fn clip(values: &mut [f64], lower: f64, upper: f64) {
    for v in values.iter_mut().filter(|v| v.is_finite()) {
        if lower.is_finite() && *v < lower {
            *v = lower;
        }
        if upper.is_finite() && *v > upper {
            *v = upper;
        }
    }
}

/// Standardize a slice of f64 values to z-scores (mean=0, std=1).
///
/// Uses sample standard deviation (N-1 denominator). NaN inputs stay NaN.
///
/// # Edge Cases
///
/// - Empty input: returns an empty vector with mean=NaN, std=NaN, applied=false
/// - Fewer than two finite values or constant values: z-scores are undefined
///   and every output is NaN, applied=false
///
/// # Examples
///
/// ```
/// use factorlab_traits::stats::standardize;
///
/// let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
/// let (standardized, result) = standardize(&values);
///
/// assert!(result.applied);
/// assert!((result.mean - 3.0).abs() < 1e-10);
/// assert!(standardized[2].abs() < 1e-10);
/// ```
pub fn standardize(values: &[f64]) -> (Vec<f64>, StandardizeResult) {
    let m = mean(values);
    let std = sample_std(values);
    let applied = !is_degenerate_std(std, m);

    let standardized = if applied {
        values.iter().map(|x| (x - m) / std).collect()
    } else {
        vec![f64::NAN; values.len()]
    };

    (
        standardized,
        StandardizeResult {
            mean: m,
            std,
            applied,
        },
    )
}
