//! Yahoo Finance provider
//!
//! Prices come from the chart endpoint (`chart.result[0].meta.regularMarketPrice`),
//! suggestions from the search endpoint (`quotes[].symbol`).

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use super::{QuoteProvider, UpstreamError, MAX_SUGGESTIONS};
use crate::config::GatewaySettings;
use crate::logger;

#[derive(Debug, Clone)]
pub struct YahooProvider {
    client: reqwest::Client,
    chart_url: String,
    search_url: String,
}

impl YahooProvider {
    pub fn new(settings: &GatewaySettings) -> Result<Self, reqwest::Error> {
        let client = client_builder(settings).build()?;
        Ok(Self::with_client(client, settings))
    }

    pub fn with_client(client: reqwest::Client, settings: &GatewaySettings) -> Self {
        Self {
            client,
            chart_url: settings.chart_url.clone(),
            search_url: settings.search_url.clone(),
        }
    }

    fn chart_endpoint(&self, symbol: &str) -> String {
        format!("{}/{}", self.chart_url, urlencoding::encode(symbol))
    }

    fn search_endpoint(&self, query: &str) -> String {
        format!(
            "{}?q={}&quotesCount={MAX_SUGGESTIONS}&newsCount=0",
            self.search_url,
            urlencoding::encode(query)
        )
    }

    async fn get(&self, endpoint: &str) -> Result<(StatusCode, String), UpstreamError> {
        logger::log_debug(&format!("[Upstream] GET {endpoint}"));
        let response = self.client.get(endpoint).send().await.map_err(|e| {
            if e.is_connect() {
                UpstreamError::Transport(format!("connection failed: {e}"))
            } else {
                UpstreamError::Transport(e.to_string())
            }
        })?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::Transport(format!("failed to read response body: {e}")))?;
        Ok((status, body))
    }
}

fn client_builder(settings: &GatewaySettings) -> reqwest::ClientBuilder {
    reqwest::Client::builder().user_agent(settings.user_agent.as_str())
}

#[async_trait]
impl QuoteProvider for YahooProvider {
    async fn latest_price(&self, symbol: &str) -> Result<Option<f64>, UpstreamError> {
        let (status, body) = self.get(&self.chart_endpoint(symbol)).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(UpstreamError::Status(status.as_u16()));
        }
        parse_chart_price(&body)
    }

    async fn search_symbols(&self, query: &str) -> Result<Vec<String>, UpstreamError> {
        let (status, body) = self.get(&self.search_endpoint(query)).await?;
        if !status.is_success() {
            return Err(UpstreamError::Status(status.as_u16()));
        }
        parse_search_symbols(&body)
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartData,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: Option<ChartMeta>,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(rename = "regularMarketPrice", default)]
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    quotes: Vec<SearchQuote>,
}

#[derive(Debug, Deserialize)]
struct SearchQuote {
    #[serde(default)]
    symbol: Option<String>,
}

fn parse_chart_price(body: &str) -> Result<Option<f64>, UpstreamError> {
    let response: ChartResponse =
        serde_json::from_str(body).map_err(|e| UpstreamError::Decode(e.to_string()))?;
    Ok(response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .and_then(|result| result.meta)
        .and_then(|meta| meta.regular_market_price))
}

fn parse_search_symbols(body: &str) -> Result<Vec<String>, UpstreamError> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|e| UpstreamError::Decode(e.to_string()))?;
    Ok(response
        .quotes
        .into_iter()
        .filter_map(|quote| quote.symbol)
        .filter(|symbol| !symbol.is_empty())
        .take(MAX_SUGGESTIONS)
        .collect())
}
