//! Technical indicator engine
//!
//! Pure rolling-window computations over OHLCV history. Every function
//! returns columns aligned to the input length, with NaN wherever the window
//! has insufficient history; a window longer than the whole series yields an
//! all-NaN column rather than an error. Division-by-zero cases are resolved
//! explicitly (RSI with no losses reads 100, a flat series has Sharpe 0,
//! beta against a flat market is omitted) so NaN/Inf never leak silently
//! into downstream consumers.

use log::{debug, error};
use std::cmp::Ordering;

use crate::error::{InsightError, Result};
use crate::models::{IndicatorSet, PriceSeries, RiskMetrics, SupportResistance};

/// Trading days per year, used for annualization.
pub const TRADING_DAYS: f64 = 252.0;

/// Annualized risk-free rate assumed by the Sharpe ratio.
pub const RISK_FREE_RATE: f64 = 0.02;

/// Fail with a logged `Computation` error when the series is too short to
/// derive anything from.
pub(crate) fn ensure_computable(series: &PriceSeries, what: &str) -> Result<()> {
    if series.len() < 2 {
        let err = InsightError::Computation(format!(
            "{} requires at least 2 bars for {}, got {}",
            what,
            series.symbol,
            series.len()
        ));
        error!("{}", err);
        return Err(err);
    }
    Ok(())
}

/// Simple moving average over a trailing window.
pub fn calculate_sma(values: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if window == 0 || values.len() < window {
        return out;
    }
    let mut sum: f64 = values[..window].iter().sum();
    out[window - 1] = sum / window as f64;
    for i in window..values.len() {
        sum += values[i] - values[i - window];
        out[i] = sum / window as f64;
    }
    out
}

/// Exponential moving average with decay `2 / (span + 1)`.
///
/// No minimum-periods floor: the first output equals the first observation
/// and later values blend geometrically.
pub fn calculate_ema(values: &[f64], span: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if span == 0 || values.is_empty() {
        return out;
    }
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut ema = values[0];
    out[0] = ema;
    for i in 1..values.len() {
        ema = alpha * values[i] + (1.0 - alpha) * ema;
        out[i] = ema;
    }
    out
}

/// MACD line (EMA12 - EMA26) and its 9-span EMA signal line.
pub fn calculate_macd(closes: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let ema12 = calculate_ema(closes, 12);
    let ema26 = calculate_ema(closes, 26);
    let macd: Vec<f64> = ema12.iter().zip(&ema26).map(|(a, b)| a - b).collect();
    let signal = calculate_macd_signal(&macd);
    (macd, signal)
}

/// 9-span EMA of an already-computed MACD line.
pub fn calculate_macd_signal(macd: &[f64]) -> Vec<f64> {
    calculate_ema(macd, 9)
}

/// Relative strength index from rolling means of clipped close deltas.
///
/// A window with zero average loss reads as RSI = 100 (maximally overbought)
/// instead of dividing by zero.
pub fn calculate_rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period + 1 {
        return out;
    }

    // Clipped deltas; the delta at index i compares close[i] to close[i-1],
    // so index 0 has none and the first defined RSI sits at index `period`.
    let mut gains = vec![0.0; n];
    let mut losses = vec![0.0; n];
    for i in 1..n {
        let delta = closes[i] - closes[i - 1];
        if delta > 0.0 {
            gains[i] = delta;
        } else {
            losses[i] = -delta;
        }
    }

    for i in period..n {
        let lo = i + 1 - period;
        let avg_gain: f64 = gains[lo..=i].iter().sum::<f64>() / period as f64;
        let avg_loss: f64 = losses[lo..=i].iter().sum::<f64>() / period as f64;
        out[i] = if avg_loss == 0.0 {
            100.0
        } else {
            let rs = avg_gain / avg_loss;
            100.0 - 100.0 / (1.0 + rs)
        };
    }
    out
}

/// Bollinger Bands: `(upper, middle, lower)` where middle is the SMA and the
/// bands sit `num_std` rolling sample standard deviations away.
pub fn calculate_bollinger_bands(
    closes: &[f64],
    window: usize,
    num_std: f64,
) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let middle = calculate_sma(closes, window);
    let std = rolling_std(closes, window);
    let upper = middle
        .iter()
        .zip(&std)
        .map(|(m, s)| m + num_std * s)
        .collect();
    let lower = middle
        .iter()
        .zip(&std)
        .map(|(m, s)| m - num_std * s)
        .collect();
    (upper, middle, lower)
}

/// Average true range: rolling mean of
/// `max(high - low, |high - prev_close|, |low - prev_close|)`.
///
/// The first bar has no previous close, so its true range is just high - low.
pub fn calculate_atr(series: &PriceSeries, period: usize) -> Vec<f64> {
    let bars = &series.bars;
    let mut true_range = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        let high_low = bar.high - bar.low;
        let tr = if i == 0 {
            high_low
        } else {
            let prev_close = bars[i - 1].close;
            high_low
                .max((bar.high - prev_close).abs())
                .max((bar.low - prev_close).abs())
        };
        true_range.push(tr);
    }
    calculate_sma(&true_range, period)
}

/// Annualized historical volatility: rolling sample std of log returns
/// scaled by sqrt(252).
///
/// The first return is undefined, so values are NaN through index `window`.
pub fn calculate_volatility(closes: &[f64], window: usize) -> Vec<f64> {
    let n = closes.len();
    let mut out = vec![f64::NAN; n];
    if window < 2 || n < window + 1 {
        return out;
    }
    let mut returns = vec![f64::NAN; n];
    for i in 1..n {
        returns[i] = (closes[i] / closes[i - 1]).ln();
    }
    for i in window..n {
        out[i] = sample_std(&returns[i + 1 - window..=i]) * TRADING_DAYS.sqrt();
    }
    out
}

/// Identify support and resistance levels.
///
/// A bar is a support candidate when its low is <= every low within `window`
/// bars on both sides; resistance is symmetric on highs. Candidates are
/// sorted ascending and the last `num_points` are kept, so the result is the
/// `num_points` largest qualifying price values, still in ascending order.
pub fn identify_support_resistance(
    series: &PriceSeries,
    window: usize,
    num_points: usize,
) -> SupportResistance {
    let lows = series.lows();
    let highs = series.highs();
    let n = series.len();

    let mut support = Vec::new();
    let mut resistance = Vec::new();
    if window > 0 && n > 2 * window {
        for i in window..n - window {
            let low = lows[i];
            if lows[i - window..i].iter().all(|&v| low <= v)
                && lows[i + 1..=i + window].iter().all(|&v| low <= v)
            {
                support.push(low);
            }
            let high = highs[i];
            if highs[i - window..i].iter().all(|&v| high >= v)
                && highs[i + 1..=i + window].iter().all(|&v| high >= v)
            {
                resistance.push(high);
            }
        }
    }

    support.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    resistance.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let support = support.split_off(support.len().saturating_sub(num_points));
    let resistance = resistance.split_off(resistance.len().saturating_sub(num_points));

    SupportResistance {
        support,
        resistance,
    }
}

/// Risk metrics over daily simple returns.
///
/// Sharpe assumes a 2% annualized risk-free rate; beta is computed against
/// `market_closes` when supplied and must cover the same bars as the series.
pub fn calculate_risk_metrics(
    series: &PriceSeries,
    market_closes: Option<&[f64]>,
) -> Result<RiskMetrics> {
    ensure_computable(series, "risk metrics")?;
    let closes = series.closes();
    let returns = pct_change(&closes);

    let mean_excess = returns
        .iter()
        .map(|r| r - RISK_FREE_RATE / TRADING_DAYS)
        .sum::<f64>()
        / returns.len() as f64;
    let std_returns = sample_std(&returns);
    let sharpe_ratio = if std_returns > 0.0 {
        TRADING_DAYS.sqrt() * mean_excess / std_returns
    } else {
        // Flat series carries no excess-return signal.
        0.0
    };

    let mut cumulative = 1.0;
    let mut peak = f64::NEG_INFINITY;
    let mut max_drawdown = f64::INFINITY;
    for r in &returns {
        cumulative *= 1.0 + r;
        peak = peak.max(cumulative);
        max_drawdown = max_drawdown.min(cumulative / peak - 1.0);
    }

    let var_95 = percentile(&returns, 5.0);

    let beta = match market_closes {
        Some(market) => {
            if market.len() != closes.len() {
                let err = InsightError::Computation(format!(
                    "market series has {} bars, expected {}",
                    market.len(),
                    closes.len()
                ));
                error!("{}", err);
                return Err(err);
            }
            let market_returns = pct_change(market);
            let market_variance = sample_var(&market_returns);
            if market_variance > 0.0 {
                Some(sample_cov(&returns, &market_returns) / market_variance)
            } else {
                // A flat market gives beta no denominator; omit the metric.
                None
            }
        }
        None => None,
    };

    debug!(
        "risk metrics for {}: sharpe={:.4} max_dd={:.4} var95={:.4}",
        series.symbol, sharpe_ratio, max_drawdown, var_95
    );

    Ok(RiskMetrics {
        sharpe_ratio,
        max_drawdown,
        var_95,
        beta,
    })
}

/// Compute the full standard indicator set for a series.
pub fn calculate_all(series: &PriceSeries) -> Result<IndicatorSet> {
    ensure_computable(series, "technical indicators")?;
    let closes = series.closes();

    let mut set = IndicatorSet::new(series.len());
    set.insert("SMA_20", calculate_sma(&closes, 20))?;
    set.insert("SMA_50", calculate_sma(&closes, 50))?;
    set.insert("SMA_200", calculate_sma(&closes, 200))?;
    set.insert("EMA_12", calculate_ema(&closes, 12))?;
    set.insert("EMA_26", calculate_ema(&closes, 26))?;

    let (macd, macd_signal) = calculate_macd(&closes);
    set.insert("MACD", macd)?;
    set.insert("MACD_Signal", macd_signal)?;

    set.insert("RSI", calculate_rsi(&closes, 14))?;

    let (bb_upper, bb_middle, bb_lower) = calculate_bollinger_bands(&closes, 20, 2.0);
    set.insert("BB_Upper", bb_upper)?;
    set.insert("BB_Middle", bb_middle)?;
    set.insert("BB_Lower", bb_lower)?;

    set.insert("ATR", calculate_atr(series, 14))?;
    set.insert("Volatility", calculate_volatility(&closes, 20))?;

    debug!(
        "computed {} indicator columns for {}",
        set.names().count(),
        series.symbol
    );
    Ok(set)
}

/// Period-over-period simple returns; one entry shorter than the input.
pub(crate) fn pct_change(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect()
}

/// Sample standard deviation (n - 1 denominator); NaN below two values.
pub(crate) fn sample_std(values: &[f64]) -> f64 {
    sample_var(values).sqrt()
}

/// Rolling sample standard deviation over a trailing window, aligned to the
/// input length exactly like [`calculate_sma`]: NaN until the window fills,
/// then the sample std of each trailing window.
pub(crate) fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if window == 0 || values.len() < window {
        return out;
    }
    for i in window - 1..values.len() {
        out[i] = sample_std(&values[i + 1 - window..=i]);
    }
    out
}

fn sample_var(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64
}

fn sample_cov(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len();
    if n < 2 || n != b.len() {
        return f64::NAN;
    }
    let mean_a = a.iter().sum::<f64>() / n as f64;
    let mean_b = b.iter().sum::<f64>() / n as f64;
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - mean_a) * (y - mean_b))
        .sum::<f64>()
        / (n - 1) as f64
}

/// Percentile with linear interpolation between order statistics.
fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let weight = rank - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PriceBar;
    use chrono::NaiveDate;

    fn series_from_bars(closes: &[f64], highs: &[f64], lows: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                timestamp: start + chrono::Days::new(i as u64),
                open: close,
                high: highs[i],
                low: lows[i],
                close,
                volume: 1000.0,
            })
            .collect();
        PriceSeries::new("BTC-USD", bars)
    }

    fn series_from_closes(closes: &[f64]) -> PriceSeries {
        let highs: Vec<f64> = closes.iter().map(|c| c + 1.0).collect();
        let lows: Vec<f64> = closes.iter().map(|c| c - 1.0).collect();
        series_from_bars(closes, &highs, &lows)
    }

    #[test]
    fn test_sma_window_boundaries() {
        let closes: Vec<f64> = (1..=60).map(|i| i as f64).collect();
        let sma20 = calculate_sma(&closes, 20);
        let sma50 = calculate_sma(&closes, 50);

        for i in 0..19 {
            assert!(sma20[i].is_nan());
        }
        for value in sma20.iter().skip(19) {
            assert!(!value.is_nan());
        }
        for i in 0..49 {
            assert!(sma50[i].is_nan());
        }
        for value in sma50.iter().skip(49) {
            assert!(!value.is_nan());
        }

        // Mean of 1..=20 is 10.5.
        assert!((sma20[19] - 10.5).abs() < 1e-9);
        assert!((sma20[20] - 11.5).abs() < 1e-9);
    }

    #[test]
    fn test_sma_longer_than_series_is_all_nan() {
        let closes = vec![1.0, 2.0, 3.0];
        assert!(calculate_sma(&closes, 10).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_ema_starts_at_first_value() {
        let closes = vec![10.0, 20.0, 30.0];
        let ema = calculate_ema(&closes, 12);
        assert!((ema[0] - 10.0).abs() < 1e-12);
        let alpha = 2.0 / 13.0;
        assert!((ema[1] - (alpha * 20.0 + (1.0 - alpha) * 10.0)).abs() < 1e-12);
    }

    #[test]
    fn test_macd_is_ema_difference() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let ema12 = calculate_ema(&closes, 12);
        let ema26 = calculate_ema(&closes, 26);
        let (macd, signal) = calculate_macd(&closes);
        for i in 0..closes.len() {
            assert!((macd[i] - (ema12[i] - ema26[i])).abs() < 1e-9);
            assert!(!signal[i].is_nan());
        }
    }

    #[test]
    fn test_rsi_bounded() {
        let closes: Vec<f64> = (0..100)
            .map(|i| 100.0 + (i as f64 * 1.3).sin() * 10.0)
            .collect();
        let rsi = calculate_rsi(&closes, 14);
        for i in 0..14 {
            assert!(rsi[i].is_nan());
        }
        for value in rsi.iter().skip(14) {
            assert!(*value >= 0.0 && *value <= 100.0);
        }
    }

    #[test]
    fn test_rsi_flat_series_reads_100() {
        // Zero-loss windows hit the division-by-zero branch.
        let closes = vec![100.0; 60];
        let rsi = calculate_rsi(&closes, 14);
        for value in rsi.iter().skip(14) {
            assert_eq!(*value, 100.0);
        }
    }

    #[test]
    fn test_rsi_all_losses_reads_0() {
        let closes: Vec<f64> = (0..40).map(|i| 200.0 - i as f64).collect();
        let rsi = calculate_rsi(&closes, 14);
        assert!((rsi[39] - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_bollinger_bands_bracket_the_middle() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64).cos() * 3.0).collect();
        let (upper, middle, lower) = calculate_bollinger_bands(&closes, 20, 2.0);
        for i in 19..closes.len() {
            assert!(upper[i] >= middle[i]);
            assert!(lower[i] <= middle[i]);
        }
        for i in 0..19 {
            assert!(upper[i].is_nan() && middle[i].is_nan() && lower[i].is_nan());
        }
    }

    #[test]
    fn test_atr_constant_range() {
        // Every bar spans exactly 2.0 and closes mid-range, so the true
        // range never exceeds the high-low span.
        let closes = vec![100.0; 30];
        let series = series_from_closes(&closes);
        let atr = calculate_atr(&series, 14);
        for i in 0..13 {
            assert!(atr[i].is_nan());
        }
        for value in atr.iter().skip(13) {
            assert!((value - 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_volatility_flat_series_is_zero() {
        let closes = vec![100.0; 60];
        let vol = calculate_volatility(&closes, 20);
        for i in 0..=19 {
            assert!(vol[i].is_nan());
        }
        for value in vol.iter().skip(20) {
            assert_eq!(*value, 0.0);
        }
    }

    #[test]
    fn test_support_resistance_stepwise_series() {
        // Non-decreasing stepwise highs/lows: each plateau interior clears
        // both neighborhood checks, so resistance fills up and the largest
        // five plateau values win after the ascending sort-and-slice.
        let closes: Vec<f64> = (0..200).map(|i| 100.0 + (i / 25) as f64 * 10.0).collect();
        let series = series_from_bars(&closes, &closes, &closes);
        let levels = identify_support_resistance(&series, 20, 5);

        assert_eq!(levels.resistance.len(), 5);
        for pair in levels.resistance.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
        assert_eq!(levels.resistance[4], 170.0);
    }

    #[test]
    fn test_support_resistance_strictly_increasing_has_no_extrema() {
        // No interior local minima (or maxima) in a strictly increasing
        // series: every candidate fails one side of the neighborhood check.
        let closes: Vec<f64> = (0..200).map(|i| 100.0 + i as f64).collect();
        let series = series_from_closes(&closes);
        let levels = identify_support_resistance(&series, 20, 5);
        assert!(levels.support.is_empty());
        assert!(levels.resistance.is_empty());
    }

    #[test]
    fn test_support_resistance_short_series_is_empty() {
        let closes = vec![100.0; 30];
        let series = series_from_closes(&closes);
        let levels = identify_support_resistance(&series, 20, 5);
        assert!(levels.support.is_empty());
        assert!(levels.resistance.is_empty());
    }

    #[test]
    fn test_risk_metrics_flat_series() {
        let closes = vec![100.0; 60];
        let series = series_from_closes(&closes);
        let metrics = calculate_risk_metrics(&series, None).unwrap();
        assert_eq!(metrics.sharpe_ratio, 0.0);
        assert_eq!(metrics.max_drawdown, 0.0);
        assert_eq!(metrics.var_95, 0.0);
        assert!(metrics.beta.is_none());
    }

    #[test]
    fn test_risk_metrics_drawdown() {
        // 100 -> 110 -> 55 -> 66: the trough sits 50% below the 110 peak.
        let closes = vec![100.0, 110.0, 55.0, 66.0];
        let series = series_from_closes(&closes);
        let metrics = calculate_risk_metrics(&series, None).unwrap();
        assert!((metrics.max_drawdown + 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_risk_metrics_beta_against_itself_is_one() {
        let closes: Vec<f64> = (0..60)
            .map(|i| 100.0 + (i as f64 * 0.9).sin() * 4.0)
            .collect();
        let series = series_from_closes(&closes);
        let metrics = calculate_risk_metrics(&series, Some(&closes)).unwrap();
        assert!((metrics.beta.unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_risk_metrics_beta_flat_market_omitted() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let market = vec![50.0; 30];
        let series = series_from_closes(&closes);
        let metrics = calculate_risk_metrics(&series, Some(&market)).unwrap();
        assert!(metrics.beta.is_none());
    }

    #[test]
    fn test_risk_metrics_mismatched_market_fails() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let market = vec![50.0; 10];
        let series = series_from_closes(&closes);
        assert!(calculate_risk_metrics(&series, Some(&market)).is_err());
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = vec![1.0, 2.0, 3.0, 4.0];
        assert!((percentile(&values, 50.0) - 2.5).abs() < 1e-12);
        assert!((percentile(&values, 0.0) - 1.0).abs() < 1e-12);
        assert!((percentile(&values, 100.0) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_calculate_all_columns() {
        let closes: Vec<f64> = (0..250)
            .map(|i| 100.0 + (i as f64 * 0.3).sin() * 8.0 + i as f64 * 0.1)
            .collect();
        let series = series_from_closes(&closes);
        let set = calculate_all(&series).unwrap();

        let expected = [
            "ATR",
            "BB_Lower",
            "BB_Middle",
            "BB_Upper",
            "EMA_12",
            "EMA_26",
            "MACD",
            "MACD_Signal",
            "RSI",
            "SMA_20",
            "SMA_200",
            "SMA_50",
            "Volatility",
        ];
        assert_eq!(set.names().collect::<Vec<_>>(), expected);
        for (_, column) in set.iter() {
            assert_eq!(column.len(), series.len());
        }
    }

    #[test]
    fn test_calculate_all_rejects_single_bar() {
        let series = series_from_closes(&[100.0]);
        assert!(calculate_all(&series).is_err());
    }
}
