//! Price and volume based factor definitions.

use crate::FactorExpression;
use serde::{Deserialize, Serialize};

/// Daily return of the close, as used by the dispersion factors.
const DAILY_RETURN: &str = "$close / Ref($close, 1) - 1";

/// Typical price used by CCI.
const TYPICAL_PRICE: &str = "($high + $low + $close) / 3";

/// A technical indicator with its window parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TechnicalFactor {
    /// Price change over `period` days.
    Momentum {
        /// Lookback in days.
        period: usize,
    },
    /// Short-horizon price change, traded contrarian.
    Reversal {
        /// Lookback in days.
        period: usize,
    },
    /// Simple moving average of the close.
    MovingAverage {
        /// Window in days.
        period: usize,
    },
    /// MACD histogram (DIF minus DEA).
    Macd {
        /// Fast EMA span.
        fast: usize,
        /// Slow EMA span.
        slow: usize,
        /// Signal EMA span.
        signal: usize,
    },
    /// Relative strength index.
    Rsi {
        /// Window in days.
        period: usize,
    },
    /// Position of the close inside its Bollinger band, 0 at the lower band.
    BollingerPosition {
        /// Window in days.
        period: usize,
        /// Band half-width in standard deviations.
        n_std: f64,
    },
    /// Average true range.
    Atr {
        /// Window in days.
        period: usize,
    },
    /// Volume over its moving average.
    VolumeRatio {
        /// Window in days.
        period: usize,
    },
    /// Traded amount over its moving average.
    AmountRatio {
        /// Window in days.
        period: usize,
    },
    /// Volume-weighted average price.
    Vwap {
        /// Window in days.
        period: usize,
    },
    /// Rate of change.
    Roc {
        /// Lookback in days.
        period: usize,
    },
    /// Commodity channel index.
    Cci {
        /// Window in days.
        period: usize,
    },
    /// K line of the KDJ stochastic oscillator.
    Kdj {
        /// Window in days.
        period: usize,
    },
    /// Rolling correlation of close and volume.
    PriceVolumeCorrelation {
        /// Window in days.
        period: usize,
    },
    /// Rolling standard deviation of daily returns.
    Volatility {
        /// Window in days.
        period: usize,
    },
    /// Rolling skewness of daily returns.
    Skewness {
        /// Window in days.
        period: usize,
    },
    /// Rolling kurtosis of daily returns.
    Kurtosis {
        /// Window in days.
        period: usize,
    },
}

impl TechnicalFactor {
    /// MACD with the usual 12/26/9 spans.
    pub const fn macd() -> Self {
        Self::Macd {
            fast: 12,
            slow: 26,
            signal: 9,
        }
    }

    /// Bollinger position over 20 days with 2-sigma bands.
    pub const fn bollinger() -> Self {
        Self::BollingerPosition {
            period: 20,
            n_std: 2.0,
        }
    }

    /// Built-in keys and their definitions.
    pub fn builtin() -> Vec<(&'static str, Self)> {
        vec![
            ("momentum_20", Self::Momentum { period: 20 }),
            ("momentum_60", Self::Momentum { period: 60 }),
            ("reversal_1", Self::Reversal { period: 1 }),
            ("reversal_5", Self::Reversal { period: 5 }),
            ("ma_20", Self::MovingAverage { period: 20 }),
            ("ma_60", Self::MovingAverage { period: 60 }),
            ("macd", Self::macd()),
            ("rsi_14", Self::Rsi { period: 14 }),
            ("bbands", Self::bollinger()),
            ("atr_14", Self::Atr { period: 14 }),
            ("volume_ratio", Self::VolumeRatio { period: 20 }),
            ("amount_ratio", Self::AmountRatio { period: 20 }),
            ("vwap_20", Self::Vwap { period: 20 }),
            ("roc_12", Self::Roc { period: 12 }),
            ("cci_14", Self::Cci { period: 14 }),
            ("kdj_9", Self::Kdj { period: 9 }),
            ("price_vol_corr", Self::PriceVolumeCorrelation { period: 20 }),
            ("volatility_20", Self::Volatility { period: 20 }),
            ("skewness_20", Self::Skewness { period: 20 }),
            ("kurtosis_20", Self::Kurtosis { period: 20 }),
        ]
    }
}

impl FactorExpression for TechnicalFactor {
    fn expression(&self) -> String {
        match *self {
            Self::Momentum { period } | Self::Reversal { period } => {
                format!("Ref($close, {period}) / $close - 1")
            }
            Self::MovingAverage { period } => format!("Mean($close, {period})"),
            Self::Macd { fast, slow, signal } => {
                let dif = format!("(EMA($close, {fast}) - EMA($close, {slow}))");
                format!("({dif} - EMA({dif}, {signal}))")
            }
            Self::Rsi { period } => format!("RSI($close, {period})"),
            Self::BollingerPosition { period, n_std } => {
                let ma = format!("Mean($close, {period})");
                let std = format!("Std($close, {period})");
                let upper = format!("({ma} + {n_std:?} * {std})");
                let lower = format!("({ma} - {n_std:?} * {std})");
                format!("($close - {lower}) / ({upper} - {lower})")
            }
            Self::Atr { period } => {
                let tr = "Max($high - $low, Abs($high - Ref($close, 1)), Abs($low - Ref($close, 1)))";
                format!("Mean({tr}, {period})")
            }
            Self::VolumeRatio { period } => format!("$volume / Mean($volume, {period})"),
            Self::AmountRatio { period } => format!("$amount / Mean($amount, {period})"),
            Self::Vwap { period } => {
                format!("Sum($amount, {period}) / Sum($volume, {period})")
            }
            Self::Roc { period } => {
                format!("($close - Ref($close, {period})) / Ref($close, {period})")
            }
            Self::Cci { period } => {
                let ma = format!("Mean({TYPICAL_PRICE}, {period})");
                let md = format!("Mean(Abs({TYPICAL_PRICE} - {ma}), {period})");
                format!("({TYPICAL_PRICE} - {ma}) / (0.015 * {md})")
            }
            Self::Kdj { period } => {
                let lowest = format!("Rolling(Min($low, {period}), {period})");
                let highest = format!("Rolling(Max($high, {period}), {period})");
                format!("($close - {lowest}) / ({highest} - {lowest}) * 100")
            }
            Self::PriceVolumeCorrelation { period } => {
                format!("Corr($close, $volume, {period})")
            }
            Self::Volatility { period } => format!("Std({DAILY_RETURN}, {period})"),
            Self::Skewness { period } => format!("Skew({DAILY_RETURN}, {period})"),
            Self::Kurtosis { period } => format!("Kurt({DAILY_RETURN}, {period})"),
        }
    }

    fn description(&self) -> &str {
        match self {
            Self::Momentum { .. } => "Price momentum",
            Self::Reversal { .. } => "Short-term reversal",
            Self::MovingAverage { .. } => "Moving average of the close",
            Self::Macd { .. } => "MACD histogram",
            Self::Rsi { .. } => "Relative strength index",
            Self::BollingerPosition { .. } => "Position within the Bollinger band",
            Self::Atr { .. } => "Average true range",
            Self::VolumeRatio { .. } => "Volume relative to its average",
            Self::AmountRatio { .. } => "Traded amount relative to its average",
            Self::Vwap { .. } => "Volume-weighted average price",
            Self::Roc { .. } => "Rate of change",
            Self::Cci { .. } => "Commodity channel index",
            Self::Kdj { .. } => "Stochastic K line",
            Self::PriceVolumeCorrelation { .. } => "Correlation of price and volume",
            Self::Volatility { .. } => "Volatility of daily returns",
            Self::Skewness { .. } => "Skewness of daily returns",
            Self::Kurtosis { .. } => "Kurtosis of daily returns",
        }
    }
}
