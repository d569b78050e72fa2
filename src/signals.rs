//! Trading signal generation
//!
//! Reduces moving-average state to categorical trend/position labels.

use crate::error::Result;
use crate::indicators::{calculate_sma, ensure_computable};
use crate::models::{PricePosition, PriceSeries, TradingSignal, Trend};

/// Derive trend and position labels from the latest SMA-20/SMA-50 and close.
///
/// Trend is Bullish only when SMA-20 is strictly above SMA-50; equality (and
/// any NaN comparison) resolves to Bearish. Position is strong only when
/// price clears both averages in the same direction.
pub fn generate_signal(sma20: f64, sma50: f64, close: f64) -> TradingSignal {
    let trend = if sma20 > sma50 {
        Trend::Bullish
    } else {
        Trend::Bearish
    };

    let position = if close > sma20 && close > sma50 {
        PricePosition::StrongBullish
    } else if close < sma20 && close < sma50 {
        PricePosition::StrongBearish
    } else {
        PricePosition::Neutral
    };

    TradingSignal { trend, position }
}

/// Compute the signal for a full series from its latest bar.
pub fn signal_for_series(series: &PriceSeries) -> Result<TradingSignal> {
    ensure_computable(series, "trading signal")?;
    let closes = series.closes();
    let sma20 = calculate_sma(&closes, 20).last().copied().unwrap_or(f64::NAN);
    let sma50 = calculate_sma(&closes, 50).last().copied().unwrap_or(f64::NAN);
    let close = closes.last().copied().unwrap_or(f64::NAN);
    Ok(generate_signal(sma20, sma50, close))
}
