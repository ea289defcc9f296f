//! Upstream quote provider module
//!
//! The gateway consumes two provider operations: latest price by symbol and
//! free-text symbol search.

mod yahoo;

#[cfg(test)]
pub mod stub;

use async_trait::async_trait;
use thiserror::Error;

pub use yahoo::YahooProvider;

/// Maximum number of similar symbols offered when a price is missing
pub const MAX_SUGGESTIONS: usize = 3;

/// Failure talking to the upstream provider
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("provider returned status {0}")]
    Status(u16),
    #[error("invalid provider response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Latest regular-market price, `Ok(None)` when the provider knows no price
    async fn latest_price(&self, symbol: &str) -> Result<Option<f64>, UpstreamError>;

    /// Candidate symbols for a free-text query, at most [`MAX_SUGGESTIONS`]
    async fn search_symbols(&self, query: &str) -> Result<Vec<String>, UpstreamError>;
}
