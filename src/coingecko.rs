// CoinGecko sentiment client
// Pulls spot price, 24h change and market cap from the public simple-price
// endpoint for the "AI Insights" sidebar.

use anyhow::{anyhow, Context, Result};
use log::info;
use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;

use crate::models::SentimentSnapshot;

const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// Client for the CoinGecko public API.
pub struct CoinGecko {
    client: Client,
}

impl Default for CoinGecko {
    fn default() -> Self {
        Self::new()
    }
}

impl CoinGecko {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Fetch the sentiment snapshot for a coin id (e.g. "bitcoin").
    pub fn fetch_sentiment(&self, coin_id: &str) -> Result<SentimentSnapshot> {
        let url = format!(
            "{}/simple/price?ids={}&vs_currencies=usd&include_24hr_change=true&include_market_cap=true",
            COINGECKO_API_URL, coin_id
        );

        let response = self
            .client
            .get(&url)
            .send()
            .context("failed to fetch sentiment data")?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(anyhow!("CoinGecko API error {} for {}", status, coin_id));
        }

        let body: Value = response
            .json()
            .context("failed to parse CoinGecko response")?;
        let snapshot = parse_sentiment_response(coin_id, &body)?;
        info!(
            "sentiment for {}: ${:.2} ({:+.2}% 24h)",
            coin_id, snapshot.price_usd, snapshot.price_change_24h
        );
        Ok(snapshot)
    }
}

/// Parse a simple-price payload for one coin.
pub fn parse_sentiment_response(coin_id: &str, body: &Value) -> Result<SentimentSnapshot> {
    let entry = body
        .get(coin_id)
        .ok_or_else(|| anyhow!("no sentiment data for {}", coin_id))?;

    let price_usd = entry["usd"]
        .as_f64()
        .ok_or_else(|| anyhow!("missing usd price for {}", coin_id))?;
    let price_change_24h = entry["usd_24h_change"]
        .as_f64()
        .ok_or_else(|| anyhow!("missing 24h change for {}", coin_id))?;
    let market_cap = entry["usd_market_cap"]
        .as_f64()
        .ok_or_else(|| anyhow!("missing market cap for {}", coin_id))?;

    Ok(SentimentSnapshot {
        price_usd,
        price_change_24h,
        market_cap,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sentiment_response() {
        let body: Value = serde_json::from_str(
            r#"{"bitcoin": {"usd": 67250.12, "usd_24h_change": -1.84, "usd_market_cap": 1324000000000.0}}"#,
        )
        .unwrap();
        let snapshot = parse_sentiment_response("bitcoin", &body).unwrap();

        assert!((snapshot.price_usd - 67250.12).abs() < 1e-9);
        assert!((snapshot.price_change_24h + 1.84).abs() < 1e-9);
        assert!((snapshot.market_cap - 1.324e12).abs() < 1e3);
    }

    #[test]
    fn test_parse_rejects_unknown_coin() {
        let body: Value = serde_json::from_str(r#"{"bitcoin": {"usd": 67250.12}}"#).unwrap();
        assert!(parse_sentiment_response("ethereum", &body).is_err());
    }

    #[test]
    fn test_parse_rejects_partial_entry() {
        let body: Value = serde_json::from_str(r#"{"bitcoin": {"usd": 67250.12}}"#).unwrap();
        assert!(parse_sentiment_response("bitcoin", &body).is_err());
    }
}
