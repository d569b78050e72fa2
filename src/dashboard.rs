//! Single-analyst dashboard session
//!
//! Ties the fetch clients, indicator engine, and knowledge store into the
//! blocking fetch -> compute -> view sequence a presentation layer consumes.
//! Each `Dashboard` value is one analyst session: the knowledge store and
//! its embeddings live here, never in process-wide state, so a multi-user
//! host gets isolation by giving each session its own value.

use log::error;
use serde::Serialize;

use crate::coingecko::CoinGecko;
use crate::error::Result;
use crate::indicators::{calculate_all, calculate_risk_metrics, identify_support_resistance};
use crate::insights::analyze_series;
use crate::knowledge::{Embedder, HashEmbedder, KnowledgeStore};
use crate::models::{
    IndicatorSet, Period, PriceSeries, QueryResult, RiskMetrics, SentimentSnapshot,
    SupportResistance, TradingSignal,
};
use crate::signals::signal_for_series;
use crate::yahoo::YahooFinance;

/// Default support/resistance detection window.
const LEVEL_WINDOW: usize = 20;

/// Default number of support/resistance points to keep.
const LEVEL_POINTS: usize = 5;

/// Everything a presentation layer needs to render one coin.
///
/// Plain structured data; no rendering logic lives here.
#[derive(Debug, Clone, Serialize)]
pub struct MarketView {
    pub series: PriceSeries,
    pub indicators: IndicatorSet,
    pub signal: TradingSignal,
    pub insights: Vec<String>,
    pub levels: SupportResistance,
    pub risk: RiskMetrics,
}

impl MarketView {
    /// Compute the full view for an already-fetched series.
    pub fn from_series(series: PriceSeries) -> Result<Self> {
        let indicators = calculate_all(&series)?;
        let signal = signal_for_series(&series)?;
        let insights = analyze_series(&series)?;
        let levels = identify_support_resistance(&series, LEVEL_WINDOW, LEVEL_POINTS);
        let risk = calculate_risk_metrics(&series, None)?;
        Ok(Self {
            series,
            indicators,
            signal,
            insights,
            levels,
            risk,
        })
    }

    /// Facts about this view, phrased for retrieval.
    pub fn knowledge_facts(&self) -> Vec<String> {
        let mut facts = self.insights.clone();
        facts.push(format!(
            "{} trend is {}",
            self.series.symbol,
            self.signal.trend.as_str()
        ));
        facts.push(format!(
            "{} price position is {}",
            self.series.symbol,
            self.signal.position.as_str()
        ));
        facts
    }
}

/// One analyst session over the supported coins.
pub struct Dashboard {
    yahoo: YahooFinance,
    coingecko: CoinGecko,
    knowledge: KnowledgeStore,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Dashboard {
    /// Session backed by the offline hash embedder.
    pub fn new() -> Self {
        Self::with_embedder(Box::new(HashEmbedder::new()))
    }

    /// Session backed by a caller-supplied embedding model.
    pub fn with_embedder(embedder: Box<dyn Embedder>) -> Self {
        Self {
            yahoo: YahooFinance::new(),
            coingecko: CoinGecko::new(),
            knowledge: KnowledgeStore::new(embedder),
        }
    }

    /// Fetch and compute the view for one coin.
    ///
    /// A fetch failure is logged and yields `Ok(None)` so the UI can show a
    /// generic error state; a computation failure on fetched data is an
    /// error the caller decides about.
    pub fn load_market_view(&self, symbol: &str, period: Period) -> Result<Option<MarketView>> {
        let series = match self.yahoo.fetch_price_series(symbol, period, "1d") {
            Ok(series) => series,
            Err(e) => {
                error!("error fetching data for {}: {}", symbol, e);
                return Ok(None);
            }
        };
        MarketView::from_series(series).map(Some)
    }

    /// Latest sentiment snapshot; absent on fetch failure.
    pub fn load_sentiment(&self, coin_id: &str) -> Option<SentimentSnapshot> {
        match self.coingecko.fetch_sentiment(coin_id) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                error!("error fetching sentiment data for {}: {}", coin_id, e);
                None
            }
        }
    }

    /// Remember the facts derived from a view for later questions.
    pub fn seed_knowledge(&mut self, view: &MarketView) -> Result<()> {
        self.knowledge.add(&view.knowledge_facts())
    }

    /// Answer a question from the session's accumulated facts.
    pub fn ask(&self, question: &str, top_k: usize) -> Result<Vec<QueryResult>> {
        self.knowledge.query(question, top_k)
    }

    pub fn knowledge(&self) -> &KnowledgeStore {
        &self.knowledge
    }
}
