//! In-memory provider for handler tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{QuoteProvider, UpstreamError};

#[derive(Debug, Clone)]
pub enum StubQuote {
    Price(f64),
    NoPrice,
    Fail(UpstreamError),
}

/// Provider answering from fixed tables and counting calls
#[derive(Debug, Default)]
pub struct StubProvider {
    quotes: HashMap<String, StubQuote>,
    suggestions: HashMap<String, Result<Vec<String>, UpstreamError>>,
    price_calls: AtomicUsize,
    search_calls: AtomicUsize,
}

impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quote(mut self, symbol: &str, quote: StubQuote) -> Self {
        self.quotes.insert(symbol.to_string(), quote);
        self
    }

    pub fn with_suggestions(
        mut self,
        query: &str,
        result: Result<Vec<String>, UpstreamError>,
    ) -> Self {
        self.suggestions.insert(query.to_string(), result);
        self
    }

    pub fn price_calls(&self) -> usize {
        self.price_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteProvider for StubProvider {
    async fn latest_price(&self, symbol: &str) -> Result<Option<f64>, UpstreamError> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        match self.quotes.get(symbol) {
            Some(StubQuote::Price(price)) => Ok(Some(*price)),
            Some(StubQuote::NoPrice) | None => Ok(None),
            Some(StubQuote::Fail(err)) => Err(err.clone()),
        }
    }

    async fn search_symbols(&self, query: &str) -> Result<Vec<String>, UpstreamError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.suggestions
            .get(query)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}
