//! Yahoo Finance market data client
//!
//! Fetches daily OHLCV history for the supported coins from the public chart
//! API. Fetch failures surface as errors here; the dashboard layer absorbs
//! them into an absent result so the UI can show a generic error state.

use anyhow::{anyhow, Context, Result};
use chrono::DateTime;
use log::{info, warn};
use reqwest::blocking::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use crate::models::{Period, PriceBar, PriceSeries};

/// Coins the dashboard supports.
pub const SUPPORTED_COINS: [&str; 5] = ["BTC-USD", "ETH-USD", "BNB-USD", "XRP-USD", "SOL-USD"];

const CHART_API_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Client for the Yahoo Finance chart API.
pub struct YahooFinance {
    client: Client,
}

impl Default for YahooFinance {
    fn default() -> Self {
        Self::new()
    }
}

impl YahooFinance {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Fetch OHLCV history for one supported symbol.
    pub fn fetch_price_series(
        &self,
        symbol: &str,
        period: Period,
        interval: &str,
    ) -> Result<PriceSeries> {
        if !SUPPORTED_COINS.contains(&symbol) {
            return Err(anyhow!("unsupported symbol: {}", symbol));
        }

        let url = format!(
            "{}/{}?range={}&interval={}",
            CHART_API_URL,
            symbol,
            period.as_str(),
            interval
        );

        let response = self
            .client
            .get(&url)
            // Yahoo rejects requests without a browser-looking agent.
            .header("User-Agent", "Mozilla/5.0")
            .send()
            .with_context(|| format!("failed to fetch data for {}", symbol))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(anyhow!("Yahoo Finance API error {} for {}", status, symbol));
        }

        let body: Value = response
            .json()
            .context("failed to parse Yahoo Finance response")?;
        let series = parse_chart_response(symbol, &body)?;
        info!("fetched {} bars for {}", series.len(), symbol);
        Ok(series)
    }

    /// Fetch several symbols at the daily interval.
    ///
    /// Per-symbol failures are logged and recorded as `None`; one bad symbol
    /// never aborts the batch.
    pub fn fetch_multiple(
        &self,
        symbols: &[&str],
        period: Period,
    ) -> HashMap<String, Option<PriceSeries>> {
        let mut out = HashMap::new();
        for &symbol in symbols {
            match self.fetch_price_series(symbol, period, "1d") {
                Ok(series) => {
                    out.insert(symbol.to_string(), Some(series));
                }
                Err(e) => {
                    warn!("error fetching data for {}: {}", symbol, e);
                    out.insert(symbol.to_string(), None);
                }
            }
        }
        out
    }
}

/// Parse a chart-API payload into a price series.
///
/// Rows with null entries (halted/partial bars) are skipped; timestamps come
/// back ascending from the API and keep that order.
pub fn parse_chart_response(symbol: &str, body: &Value) -> Result<PriceSeries> {
    let result = body["chart"]["result"]
        .get(0)
        .ok_or_else(|| anyhow!("no chart result for {}", symbol))?;

    let timestamps = result["timestamp"]
        .as_array()
        .ok_or_else(|| anyhow!("missing timestamps for {}", symbol))?;
    let quote = &result["indicators"]["quote"][0];

    let opens = &quote["open"];
    let highs = &quote["high"];
    let lows = &quote["low"];
    let closes = &quote["close"];
    let volumes = &quote["volume"];
    if closes.as_array().is_none() {
        return Err(anyhow!("missing quote data for {}", symbol));
    }

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        let fields = (
            ts.as_i64(),
            opens.get(i).and_then(Value::as_f64),
            highs.get(i).and_then(Value::as_f64),
            lows.get(i).and_then(Value::as_f64),
            closes.get(i).and_then(Value::as_f64),
            volumes.get(i).and_then(Value::as_f64),
        );
        if let (Some(ts), Some(open), Some(high), Some(low), Some(close), Some(volume)) = fields {
            let timestamp = match DateTime::from_timestamp(ts, 0) {
                Some(dt) => dt.date_naive(),
                None => continue,
            };
            bars.push(PriceBar {
                timestamp,
                open,
                high,
                low,
                close,
                volume,
            });
        }
    }

    if bars.is_empty() {
        return Err(anyhow!("no usable bars for {}", symbol));
    }
    Ok(PriceSeries::new(symbol, bars))
}
