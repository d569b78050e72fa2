//! Crypto Insight - Market Analysis Library
//!
//! A cryptocurrency analysis library for:
//! - Fetching OHLCV history from Yahoo Finance (FREE, unlimited)
//! - Computing technical indicators (moving averages, MACD, RSI, Bollinger
//!   Bands, ATR, volatility, support/resistance, risk metrics)
//! - Reducing indicators to trend/position trading signals
//! - Answering questions over computed insights with embedding retrieval
//!
//! # Example
//!
//! ```no_run
//! use crypto_insight::{Dashboard, Period};
//!
//! let mut dashboard = Dashboard::new();
//!
//! // Fetch a year of Bitcoin history and compute the full view
//! if let Some(view) = dashboard.load_market_view("BTC-USD", Period::OneYear).unwrap() {
//!     println!("{} trend: {}", view.series.symbol, view.signal.trend.as_str());
//!     for insight in &view.insights {
//!         println!("- {}", insight);
//!     }
//!
//!     // Feed the view into the session knowledge base and ask about it
//!     dashboard.seed_knowledge(&view).unwrap();
//!     for answer in dashboard.ask("How volatile is Bitcoin?", 3).unwrap() {
//!         println!("{:.3}  {}", answer.similarity, answer.fact);
//!     }
//! }
//! ```

pub mod coingecko;
pub mod dashboard;
pub mod error;
pub mod indicators;
pub mod insights;
pub mod knowledge;
pub mod models;
pub mod signals;
pub mod storage;
pub mod yahoo;

// Re-exports for convenience
pub use coingecko::CoinGecko;
pub use dashboard::{Dashboard, MarketView};
pub use error::{InsightError, Result};
pub use indicators::{
    calculate_all, calculate_atr, calculate_bollinger_bands, calculate_ema, calculate_macd,
    calculate_risk_metrics, calculate_rsi, calculate_sma, calculate_volatility,
    identify_support_resistance,
};
pub use insights::{analyze_series, format_number, summary_statistics};
pub use knowledge::{
    cosine_similarity, Embedder, HashEmbedder, KnowledgeStore, OllamaEmbedder,
};
pub use models::{
    IndicatorSet, Period, PriceBar, PricePosition, PriceSeries, QueryResult, RiskMetrics,
    SentimentSnapshot, SummaryStats, SupportResistance, TradingSignal, Trend,
};
pub use signals::{generate_signal, signal_for_series};
pub use storage::{load_from_csv, save_many_to_csv, save_to_csv, save_with_indicators};
pub use yahoo::{YahooFinance, SUPPORTED_COINS};
