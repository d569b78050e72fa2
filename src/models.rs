//! Data models for Crypto Insight

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{InsightError, Result};

/// A single OHLCV bar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Ordered OHLCV history for one symbol.
///
/// Bars are ascending by timestamp with no duplicates. A fetched series is
/// treated as immutable: indicator computation produces new derived columns
/// and never rewrites bars in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: String,
    pub bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, bars: Vec<PriceBar>) -> Self {
        Self {
            symbol: symbol.into(),
            bars,
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    /// Most recent bar, if any.
    pub fn last_bar(&self) -> Option<&PriceBar> {
        self.bars.last()
    }
}

/// Named indicator columns aligned to a source series.
///
/// Every column has exactly the source length. Entries where the rolling
/// window lacks history are NaN; NaN is carried openly rather than dropped
/// or replaced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndicatorSet {
    len: usize,
    columns: BTreeMap<String, Vec<f64>>,
}

impl IndicatorSet {
    /// Create an empty set for series of the given length.
    pub fn new(len: usize) -> Self {
        Self {
            len,
            columns: BTreeMap::new(),
        }
    }

    /// Insert a column. Rejects series that do not share the source index.
    pub fn insert(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        if values.len() != self.len {
            return Err(InsightError::Computation(format!(
                "indicator column {} has length {}, expected {}",
                name,
                values.len(),
                self.len
            )));
        }
        self.columns.insert(name.to_string(), values);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(|v| v.as_slice())
    }

    /// Latest value of a column (may be NaN).
    pub fn latest(&self, name: &str) -> Option<f64> {
        self.columns.get(name).and_then(|v| v.last().copied())
    }

    /// Column names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }

    /// Columns in sorted name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Length shared by every column (the source series length).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Direction of the moving-average trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Bullish,
    Bearish,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Bullish => "Bullish",
            Trend::Bearish => "Bearish",
        }
    }
}

/// Where price sits relative to the two moving averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PricePosition {
    StrongBullish,
    StrongBearish,
    Neutral,
}

impl PricePosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            PricePosition::StrongBullish => "Strong bullish",
            PricePosition::StrongBearish => "Strong bearish",
            PricePosition::Neutral => "Neutral",
        }
    }
}

/// Trend/position labels derived from the latest moving averages and price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingSignal {
    pub trend: Trend,
    pub position: PricePosition,
}

/// Scalar risk metrics over a return series.
///
/// `beta` is present only when a market reference series was supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub var_95: f64,
    pub beta: Option<f64>,
}

/// Support and resistance price levels, each sorted ascending.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupportResistance {
    pub support: Vec<f64>,
    pub resistance: Vec<f64>,
}

/// Spot sentiment snapshot for a coin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentSnapshot {
    pub price_usd: f64,
    pub price_change_24h: f64,
    pub market_cap: f64,
}

/// History range accepted by the market data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    TwoYears,
    FiveYears,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::TwoYears => "2y",
            Period::FiveYears => "5y",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "1mo" => Some(Period::OneMonth),
            "3mo" => Some(Period::ThreeMonths),
            "6mo" => Some(Period::SixMonths),
            "1y" => Some(Period::OneYear),
            "2y" => Some(Period::TwoYears),
            "5y" => Some(Period::FiveYears),
            _ => None,
        }
    }
}

/// One retrieved fact with its cosine similarity to the question, in [-1, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub fact: String,
    pub similarity: f32,
}

/// Headline statistics for one coin's recent history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryStats {
    pub current_price: f64,
    pub price_change_24h: f64,
    pub price_change_7d: f64,
    pub current_volume: f64,
    pub avg_volume_7d: f64,
    pub volatility_30d: f64,
    pub rsi: f64,
    pub macd: f64,
    pub trend: Trend,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_round_trip() {
        for period in [
            Period::OneMonth,
            Period::ThreeMonths,
            Period::SixMonths,
            Period::OneYear,
            Period::TwoYears,
            Period::FiveYears,
        ] {
            assert_eq!(Period::from_str(period.as_str()), Some(period));
        }
        assert_eq!(Period::from_str("10y"), None);
    }

    #[test]
    fn test_indicator_set_rejects_misaligned_column() {
        let mut set = IndicatorSet::new(10);
        assert!(set.insert("SMA_20", vec![1.0; 10]).is_ok());
        assert!(set.insert("SMA_50", vec![1.0; 9]).is_err());
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["SMA_20"]);
    }

    #[test]
    fn test_indicator_set_latest() {
        let mut set = IndicatorSet::new(3);
        set.insert("RSI", vec![f64::NAN, 40.0, 55.0]).unwrap();
        assert_eq!(set.latest("RSI"), Some(55.0));
        assert!(set.latest("MACD").is_none());
    }

    #[test]
    fn test_signal_labels() {
        assert_eq!(Trend::Bullish.as_str(), "Bullish");
        assert_eq!(PricePosition::StrongBearish.as_str(), "Strong bearish");
        assert_eq!(PricePosition::Neutral.as_str(), "Neutral");
    }
}
