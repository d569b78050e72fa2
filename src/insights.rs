//! Insight summarizer
//!
//! Turns a price series into the plain-language statements the dashboard
//! shows next to the charts, plus headline summary statistics.

use log::{debug, error};

use crate::error::{InsightError, Result};
use crate::indicators::{
    calculate_macd, calculate_rsi, calculate_sma, calculate_volatility, ensure_computable,
    pct_change, sample_std, TRADING_DAYS,
};
use crate::models::{PriceSeries, SummaryStats, Trend};

/// Derive the fixed sequence of analysis statements for a series.
///
/// Output order is stable: price change, volume vs average, annualized
/// volatility. Each statement is independently derivable from the series.
pub fn analyze_series(series: &PriceSeries) -> Result<Vec<String>> {
    ensure_computable(series, "insight analysis")?;
    let closes = series.closes();
    let volumes = series.volumes();
    let n = closes.len();

    let mut insights = Vec::with_capacity(3);

    let current_price = closes[n - 1];
    let prev_price = closes[n - 2];
    let price_change = (current_price - prev_price) / prev_price * 100.0;
    if price_change > 0.0 {
        insights.push(format!(
            "Price increased by {:.2}% in the last period",
            price_change
        ));
    } else {
        insights.push(format!(
            "Price decreased by {:.2}% in the last period",
            price_change.abs()
        ));
    }

    let avg_volume = volumes.iter().sum::<f64>() / n as f64;
    if volumes[n - 1] > avg_volume {
        insights.push(
            "Trading volume is above average, indicating strong market activity".to_string(),
        );
    } else {
        insights.push(
            "Trading volume is below average, indicating reduced market activity".to_string(),
        );
    }

    let returns = pct_change(&closes);
    let volatility = sample_std(&returns) * TRADING_DAYS.sqrt();
    insights.push(format!("Current annualized volatility: {:.2}", volatility));

    debug!("derived {} insights for {}", insights.len(), series.symbol);
    Ok(insights)
}

/// Headline summary statistics for a series.
///
/// Needs at least 7 bars for the 7-day change; the 30-day volatility, RSI
/// and MACD columns may still be NaN on short histories and are carried
/// through as-is.
pub fn summary_statistics(series: &PriceSeries) -> Result<SummaryStats> {
    if series.len() < 7 {
        let err = InsightError::Computation(format!(
            "summary statistics require at least 7 bars for {}, got {}",
            series.symbol,
            series.len()
        ));
        error!("{}", err);
        return Err(err);
    }

    let closes = series.closes();
    let volumes = series.volumes();
    let n = closes.len();

    let current_price = closes[n - 1];
    let price_change_24h = (closes[n - 1] - closes[n - 2]) / closes[n - 2] * 100.0;
    let price_change_7d = (closes[n - 1] - closes[n - 7]) / closes[n - 7] * 100.0;

    let current_volume = volumes[n - 1];
    let avg_volume_7d = volumes[n - 7..].iter().sum::<f64>() / 7.0;

    let volatility_30d = calculate_volatility(&closes, 30)
        .last()
        .copied()
        .unwrap_or(f64::NAN);
    let rsi = calculate_rsi(&closes, 14).last().copied().unwrap_or(f64::NAN);
    let (macd_line, _) = calculate_macd(&closes);
    let macd = macd_line.last().copied().unwrap_or(f64::NAN);

    let sma20 = calculate_sma(&closes, 20).last().copied().unwrap_or(f64::NAN);
    let sma50 = calculate_sma(&closes, 50).last().copied().unwrap_or(f64::NAN);
    let trend = if sma20 > sma50 {
        Trend::Bullish
    } else {
        Trend::Bearish
    };

    Ok(SummaryStats {
        current_price,
        price_change_24h,
        price_change_7d,
        current_volume,
        avg_volume_7d,
        volatility_30d,
        rsi,
        macd,
        trend,
    })
}

/// Format a dollar amount with K/M/B suffixes for display.
pub fn format_number(number: f64, decimals: usize) -> String {
    if number >= 1e9 {
        format!("${:.prec$}B", number / 1e9, prec = decimals)
    } else if number >= 1e6 {
        format!("${:.prec$}M", number / 1e6, prec = decimals)
    } else if number >= 1e3 {
        format!("${:.prec$}K", number / 1e3, prec = decimals)
    } else {
        format!("${:.prec$}", number, prec = decimals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PriceBar;
    use chrono::NaiveDate;

    fn series(closes: &[f64], volumes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                timestamp: start + chrono::Days::new(i as u64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: volumes[i],
            })
            .collect();
        PriceSeries::new("BTC-USD", bars)
    }

    #[test]
    fn test_insights_order_and_wording() {
        let closes = vec![100.0, 102.0, 101.0, 105.0];
        let volumes = vec![1000.0, 1100.0, 900.0, 2000.0];
        let insights = analyze_series(&series(&closes, &volumes)).unwrap();

        assert_eq!(insights.len(), 3);
        // (105 - 101) / 101 = 3.9604%
        assert_eq!(insights[0], "Price increased by 3.96% in the last period");
        assert_eq!(
            insights[1],
            "Trading volume is above average, indicating strong market activity"
        );
        assert!(insights[2].starts_with("Current annualized volatility: "));
    }

    #[test]
    fn test_insights_price_drop_uses_magnitude() {
        let closes = vec![100.0, 90.0];
        let volumes = vec![2000.0, 1000.0];
        let insights = analyze_series(&series(&closes, &volumes)).unwrap();
        assert_eq!(insights[0], "Price decreased by 10.00% in the last period");
        assert_eq!(
            insights[1],
            "Trading volume is below average, indicating reduced market activity"
        );
    }

    #[test]
    fn test_insights_flat_series_zero_volatility() {
        let closes = vec![100.0; 60];
        let volumes = vec![1000.0; 60];
        let insights = analyze_series(&series(&closes, &volumes)).unwrap();
        // Flat close means a 0.00% "decrease" and zero volatility.
        assert_eq!(insights[0], "Price decreased by 0.00% in the last period");
        assert_eq!(insights[2], "Current annualized volatility: 0.00");
    }

    #[test]
    fn test_insights_require_two_bars() {
        let closes = vec![100.0];
        let volumes = vec![1000.0];
        assert!(analyze_series(&series(&closes, &volumes)).is_err());
    }

    #[test]
    fn test_summary_statistics_flat_series() {
        let closes = vec![100.0; 60];
        let volumes = vec![1000.0; 60];
        let stats = summary_statistics(&series(&closes, &volumes)).unwrap();

        assert_eq!(stats.current_price, 100.0);
        assert_eq!(stats.price_change_24h, 0.0);
        assert_eq!(stats.price_change_7d, 0.0);
        assert_eq!(stats.avg_volume_7d, 1000.0);
        assert_eq!(stats.volatility_30d, 0.0);
        // Zero-loss windows resolve to RSI 100.
        assert_eq!(stats.rsi, 100.0);
        assert!((stats.macd - 0.0).abs() < 1e-12);
        assert_eq!(stats.trend, Trend::Bearish);
    }

    #[test]
    fn test_summary_statistics_requires_seven_bars() {
        let closes = vec![100.0; 6];
        let volumes = vec![1000.0; 6];
        assert!(summary_statistics(&series(&closes, &volumes)).is_err());
    }

    #[test]
    fn test_format_number_suffixes() {
        assert_eq!(format_number(1_234_567_890.0, 2), "$1.23B");
        assert_eq!(format_number(12_345_678.0, 2), "$12.35M");
        assert_eq!(format_number(12_345.0, 1), "$12.3K");
        assert_eq!(format_number(123.456, 2), "$123.46");
    }
}
