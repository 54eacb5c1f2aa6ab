//! Fundamental factor definitions.
//!
//! Most of these read a single reported field. The growth factors compare a
//! field with its value `period` reports earlier.

use crate::FactorExpression;
use serde::{Deserialize, Serialize};

/// A fundamental metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FundamentalFactor {
    /// Price to earnings.
    PeRatio,
    /// Price to book.
    PbRatio,
    /// Price to sales.
    PsRatio,
    /// Market capitalization.
    MarketCap,
    /// Return on equity.
    Roe,
    /// Return on assets.
    Roa,
    /// Gross margin.
    GrossMargin,
    /// Net margin.
    NetMargin,
    /// Liabilities over assets.
    DebtRatio,
    /// Current assets over current liabilities.
    CurrentRatio,
    /// Earnings growth against `period` reports ago.
    EarningsGrowth {
        /// Number of reports back.
        period: usize,
    },
    /// Revenue growth against `period` reports ago.
    RevenueGrowth {
        /// Number of reports back.
        period: usize,
    },
}

impl FundamentalFactor {
    /// Name of the underlying panel field.
    pub const fn field(&self) -> &'static str {
        match self {
            Self::PeRatio => "pe_ratio",
            Self::PbRatio => "pb_ratio",
            Self::PsRatio => "ps_ratio",
            Self::MarketCap => "market_cap",
            Self::Roe => "roe",
            Self::Roa => "roa",
            Self::GrossMargin => "gross_margin",
            Self::NetMargin => "net_margin",
            Self::DebtRatio => "debt_ratio",
            Self::CurrentRatio => "current_ratio",
            Self::EarningsGrowth { .. } => "earnings",
            Self::RevenueGrowth { .. } => "revenue",
        }
    }

    /// Built-in keys and their definitions. Growth compares with four reports back.
    pub fn builtin() -> Vec<(&'static str, Self)> {
        vec![
            ("pe_ratio", Self::PeRatio),
            ("pb_ratio", Self::PbRatio),
            ("ps_ratio", Self::PsRatio),
            ("market_cap", Self::MarketCap),
            ("roe", Self::Roe),
            ("roa", Self::Roa),
            ("gross_margin", Self::GrossMargin),
            ("net_margin", Self::NetMargin),
            ("debt_ratio", Self::DebtRatio),
            ("current_ratio", Self::CurrentRatio),
            ("earnings_growth", Self::EarningsGrowth { period: 4 }),
            ("revenue_growth", Self::RevenueGrowth { period: 4 }),
        ]
    }
}

impl FactorExpression for FundamentalFactor {
    fn expression(&self) -> String {
        let field = self.field();
        match self {
            Self::EarningsGrowth { period } | Self::RevenueGrowth { period } => {
                format!("${field} / Ref(${field}, {period}) - 1")
            }
            _ => format!("${field}"),
        }
    }

    fn description(&self) -> &str {
        match self {
            Self::PeRatio => "Price to earnings ratio",
            Self::PbRatio => "Price to book ratio",
            Self::PsRatio => "Price to sales ratio",
            Self::MarketCap => "Market capitalization",
            Self::Roe => "Return on equity",
            Self::Roa => "Return on assets",
            Self::GrossMargin => "Gross profit margin",
            Self::NetMargin => "Net profit margin",
            Self::DebtRatio => "Debt to assets",
            Self::CurrentRatio => "Current ratio",
            Self::EarningsGrowth { .. } => "Earnings growth",
            Self::RevenueGrowth { .. } => "Revenue growth",
        }
    }
}
