//! Quote resolution
//!
//! Exchange-prefix rewrite, cache lookup, upstream fetch and the fallback
//! symbol search for `/api/quotes/{symbol}`.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::HeaderValue;
use hyper::Response;
use std::sync::Arc;

use super::error::GatewayError;
use crate::config::AppState;
use crate::http;
use crate::http::cache::{CacheKey, CachePolicy, CachedResponse};
use crate::logger;
use crate::upstream::{QuoteProvider, MAX_SUGGESTIONS};

pub const CACHE_STATUS_HEADER: &str = "X-Cache";

/// Exchange prefixes rewritten to a Yahoo suffix
const EXCHANGE_SUFFIXES: &[(&str, &str)] = &[("BIT", "MI")];

/// Resolve a quote request into a response
pub async fn resolve_quote(
    symbol: &str,
    key: CacheKey,
    state: &AppState,
) -> Response<Full<Bytes>> {
    let provider = state.provider.as_ref();

    if let Some(location) = probe_exchange_rewrite(symbol, provider).await {
        logger::log_debug(&format!("[Quote] {symbol} rewritten to {location}"));
        return http::build_redirect_response(&location);
    }

    if let Some(cached) = state.cache.lookup(&key).await {
        logger::log_debug(&format!("[Cache] HIT {key}"));
        return with_cache_status(cached.into_response(), "HIT");
    }

    match fetch_price(symbol, provider).await {
        Ok(price) => {
            let body = format_price(price);
            let policy = CachePolicy::Public(state.settings.cache_ttl);
            let response = http::build_quote_response(body.clone(), policy);
            let copy = CachedResponse::new(
                response.status(),
                response.headers().clone(),
                Bytes::from(body),
            );
            let cache = Arc::clone(&state.cache);
            state.deferred.spawn(async move {
                cache.store(key, copy).await;
            });
            with_cache_status(response, "MISS")
        }
        Err(GatewayError::PriceUnavailable) => match similar_symbols(symbol, provider).await {
            Some(similar) => http::build_text_response(
                200,
                format!("Symbol not found - similar: {}", similar.join(" ")),
            ),
            None => GatewayError::PriceUnavailable.into_response(),
        },
        Err(err) => {
            logger::log_error(&format!("[Quote] {symbol}: {err}"));
            err.into_response()
        }
    }
}

async fn fetch_price(symbol: &str, provider: &dyn QuoteProvider) -> Result<f64, GatewayError> {
    provider
        .latest_price(symbol)
        .await?
        .ok_or(GatewayError::PriceUnavailable)
}

/// Shortest decimal text that round-trips the price
pub fn format_price(price: f64) -> String {
    price.to_string()
}

/// Map `PREFIX:BASE` to the provider symbol for a known exchange prefix
pub fn exchange_rewrite_target(symbol: &str) -> Option<String> {
    let (prefix, base) = symbol.split_once(':')?;
    if base.is_empty() {
        return None;
    }
    EXCHANGE_SUFFIXES
        .iter()
        .find(|(exchange, _)| prefix.eq_ignore_ascii_case(exchange))
        .map(|(_, suffix)| format!("{base}.{suffix}"))
}

/// Location to redirect to when the rewritten symbol has a price
async fn probe_exchange_rewrite(symbol: &str, provider: &dyn QuoteProvider) -> Option<String> {
    let candidate = exchange_rewrite_target(symbol)?;
    match provider.latest_price(&candidate).await {
        Ok(Some(_)) => Some(format!("/api/quotes/{}", urlencoding::encode(&candidate))),
        Ok(None) => None,
        Err(e) => {
            logger::log_warning(&format!("[Quote] Rewrite probe for {candidate} failed: {e}"));
            None
        }
    }
}

async fn similar_symbols(symbol: &str, provider: &dyn QuoteProvider) -> Option<Vec<String>> {
    match provider.search_symbols(symbol).await {
        Ok(mut symbols) if !symbols.is_empty() => {
            symbols.truncate(MAX_SUGGESTIONS);
            Some(symbols)
        }
        Ok(_) => None,
        Err(e) => {
            logger::log_warning(&format!("[Quote] Symbol search for {symbol} failed: {e}"));
            None
        }
    }
}

fn with_cache_status(
    mut response: Response<Full<Bytes>>,
    status: &'static str,
) -> Response<Full<Bytes>> {
    response
        .headers_mut()
        .insert(CACHE_STATUS_HEADER, HeaderValue::from_static(status));
    response
}
