//! Error types for Crypto Insight

use thiserror::Error;

/// Crate-wide error type.
///
/// The three domain variants mirror how failures travel through the app:
/// fetch errors are absorbed into absent results at the dashboard boundary,
/// computation errors are logged and re-raised to the caller, and embedding
/// errors always propagate.
#[derive(Error, Debug)]
pub enum InsightError {
    /// Network or API failure while fetching market data.
    #[error("data fetch failed: {0}")]
    DataFetch(String),

    /// Insufficient or malformed series data.
    #[error("computation failed: {0}")]
    Computation(String),

    /// Embedding model or input failure in the retriever.
    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, InsightError>;
