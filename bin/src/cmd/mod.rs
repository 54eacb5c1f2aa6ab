//! CLI command implementations.

mod backtest;
mod factors;
mod multi;

pub(crate) use backtest::run_backtest;
pub(crate) use factors::list_factors;
pub(crate) use multi::run_multi;

use clap::ValueEnum;

/// How results are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable tables
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

fn print_banner(title: &str) {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║ {title:^60} ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");
}

/// Formats a ratio as a percentage, `n/a` when undefined.
fn pct(value: f64) -> String {
    if value.is_finite() {
        format!("{:.2}%", value * 100.0)
    } else {
        "n/a".to_string()
    }
}

/// Formats a number with four decimals, `n/a` when undefined.
fn num(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.4}")
    } else {
        "n/a".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatters() {
        assert_eq!(pct(0.1234), "12.34%");
        assert_eq!(pct(f64::NAN), "n/a");
        assert_eq!(num(-0.5), "-0.5000");
        assert_eq!(num(f64::INFINITY), "n/a");
    }
}
