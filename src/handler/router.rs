//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: path matching and dispatch to
//! quote resolution, the root redirect, or not-found.

use crate::config::AppState;
use crate::handler::error::GatewayError;
use crate::handler::quote::{self, CACHE_STATUS_HEADER};
use crate::http::cache::CacheKey;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::{Method, Request, Response};
use std::borrow::Cow;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

const QUOTES_PREFIX: &str = "/api/quotes/";

/// Route selected for a request
#[derive(Debug, PartialEq, Eq)]
pub enum Route<'a> {
    Quote(Cow<'a, str>),
    Root,
    NotFound,
}

/// Match method and path against the gateway's routes
pub fn match_route<'a>(method: &Method, path: &'a str) -> Route<'a> {
    if *method != Method::GET {
        return Route::NotFound;
    }
    if path == "/" {
        return Route::Root;
    }
    match path.strip_prefix(QUOTES_PREFIX) {
        Some(segment) if !segment.is_empty() && !segment.contains('/') => {
            Route::Quote(urlencoding::decode(segment).unwrap_or(Cow::Borrowed(segment)))
        }
        _ => Route::NotFound,
    }
}

/// Main entry point for HTTP request handling
pub async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    // The body is never read; only the head takes part in routing
    let (parts, _body) = req.into_parts();
    let req = Request::from_parts(parts, ());
    let response = dispatch(&req, &state).await;

    if state.cached_access_log.load(Ordering::Relaxed) {
        let mut entry = AccessLogEntry::new(
            peer_addr.ip().to_string(),
            req.method().to_string(),
            req.uri().path().to_string(),
        );
        entry.query = req.uri().query().map(ToString::to_string);
        entry.http_version = http_version_label(req.version()).to_string();
        entry.status = response.status().as_u16();
        entry.body_bytes = usize::try_from(response.body().size_hint().exact().unwrap_or(0))
            .unwrap_or(usize::MAX);
        entry.referer = header_string(&req, "referer");
        entry.user_agent = header_string(&req, "user-agent");
        entry.cache_status = response
            .headers()
            .get(CACHE_STATUS_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Dispatch a request to its route and produce the response
pub async fn dispatch<B>(req: &Request<B>, state: &AppState) -> Response<Full<Bytes>> {
    let path = req.uri().path();
    match match_route(req.method(), path) {
        Route::Quote(symbol) => {
            let host = req
                .headers()
                .get(hyper::header::HOST)
                .and_then(|v| v.to_str().ok())
                .or_else(|| req.uri().authority().map(hyper::http::uri::Authority::as_str));
            let key = CacheKey::from_request(req.method(), host, path);
            quote::resolve_quote(&symbol, key, state).await
        }
        Route::Root => match &state.settings.root_redirect {
            Some(target) => http::build_redirect_response(target.as_str()),
            None => GatewayError::InvalidRoute.into_response(),
        },
        Route::NotFound => GatewayError::InvalidRoute.into_response(),
    }
}

fn header_string<B>(req: &Request<B>, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

const fn http_version_label(version: hyper::Version) -> &'static str {
    match version {
        hyper::Version::HTTP_10 => "1.0",
        hyper::Version::HTTP_2 => "2",
        _ => "1.1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        Config, GatewayConfig, GatewaySettings, LoggingConfig, PerformanceConfig, ServerConfig,
    };
    use crate::http::cache::{MemoryCache, ResponseCache};
    use crate::upstream::stub::{StubProvider, StubQuote};
    use crate::upstream::UpstreamError;
    use http_body_util::BodyExt;

    fn gateway_config() -> GatewayConfig {
        GatewayConfig {
            cache_ttl: None,
            root_redirect_url: None,
            user_agent: None,
            chart_url: "https://chart.test".to_string(),
            search_url: "https://search.test".to_string(),
            cache_max_entries: 100,
        }
    }

    fn test_config(gateway: GatewayConfig) -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                workers: None,
            },
            logging: LoggingConfig {
                level: "error".to_string(),
                access_log: false,
                access_log_format: "combined".to_string(),
                access_log_file: None,
                error_log_file: None,
            },
            performance: PerformanceConfig {
                keep_alive_timeout: 75,
                read_timeout: 30,
                write_timeout: 30,
                max_connections: None,
            },
            gateway,
        }
    }

    struct Harness {
        state: AppState,
        provider: Arc<StubProvider>,
        cache: Arc<MemoryCache>,
    }

    fn harness_with(gateway: GatewayConfig, provider: StubProvider) -> Harness {
        let config = test_config(gateway);
        let settings = GatewaySettings::resolve(&config.gateway);
        let provider = Arc::new(provider);
        let cache = Arc::new(MemoryCache::new(100));
        let state = AppState::with_parts(
            &config,
            settings,
            Arc::clone(&provider) as Arc<dyn crate::upstream::QuoteProvider>,
            Arc::clone(&cache) as Arc<dyn ResponseCache>,
        );
        Harness {
            state,
            provider,
            cache,
        }
    }

    fn harness(provider: StubProvider) -> Harness {
        harness_with(gateway_config(), provider)
    }

    fn request(method: Method, uri: &str) -> Request<()> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("host", "quotes.test")
            .body(())
            .unwrap()
    }

    async fn get(h: &Harness, uri: &str) -> Response<Full<Bytes>> {
        let response = dispatch(&request(Method::GET, uri), &h.state).await;
        h.state.deferred.drain().await;
        response
    }

    async fn body_text(response: Response<Full<Bytes>>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_match_route() {
        assert_eq!(
            match_route(&Method::GET, "/api/quotes/AAPL"),
            Route::Quote(Cow::Borrowed("AAPL"))
        );
        assert_eq!(
            match_route(&Method::GET, "/api/quotes/BIT%3AVWCE"),
            Route::Quote(Cow::Owned("BIT:VWCE".to_string()))
        );
        assert_eq!(match_route(&Method::GET, "/"), Route::Root);
        assert_eq!(match_route(&Method::GET, "/api/quotes/"), Route::NotFound);
        assert_eq!(match_route(&Method::GET, "/api/quotes/A/B"), Route::NotFound);
        assert_eq!(match_route(&Method::GET, "/api/quotes"), Route::NotFound);
        assert_eq!(match_route(&Method::POST, "/api/quotes/AAPL"), Route::NotFound);
        assert_eq!(match_route(&Method::HEAD, "/"), Route::NotFound);
    }

    #[tokio::test]
    async fn test_first_request_fetches_then_cache_hit() {
        let h = harness(StubProvider::new().with_quote("AAPL", StubQuote::Price(150.25)));

        let first = get(&h, "/api/quotes/AAPL").await;
        assert_eq!(first.status(), 200);
        assert_eq!(first.headers()["Content-Type"], "text/plain");
        assert_eq!(first.headers()["Cache-Control"], "public, max-age=300");
        assert_eq!(first.headers()[CACHE_STATUS_HEADER], "MISS");
        assert_eq!(body_text(first).await, "150.25");

        let second = get(&h, "/api/quotes/AAPL").await;
        assert_eq!(second.status(), 200);
        assert_eq!(second.headers()[CACHE_STATUS_HEADER], "HIT");
        assert_eq!(second.headers()["Cache-Control"], "public, max-age=300");
        assert_eq!(body_text(second).await, "150.25");

        assert_eq!(h.provider.price_calls(), 1);
    }

    #[tokio::test]
    async fn test_distinct_symbols_use_distinct_entries() {
        let h = harness(
            StubProvider::new()
                .with_quote("AAPL", StubQuote::Price(150.25))
                .with_quote("MSFT", StubQuote::Price(410.5)),
        );

        assert_eq!(body_text(get(&h, "/api/quotes/AAPL").await).await, "150.25");
        assert_eq!(body_text(get(&h, "/api/quotes/MSFT").await).await, "410.5");
        assert_eq!(h.provider.price_calls(), 2);
        assert_eq!(h.cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_query_string_does_not_affect_cache_key() {
        let h = harness(StubProvider::new().with_quote("AAPL", StubQuote::Price(150.25)));

        get(&h, "/api/quotes/AAPL?x=1").await;
        let second = get(&h, "/api/quotes/AAPL?y=2").await;
        assert_eq!(second.headers()[CACHE_STATUS_HEADER], "HIT");
        assert_eq!(h.provider.price_calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_price_without_suggestions() {
        let h = harness(StubProvider::new().with_quote("NOPE", StubQuote::NoPrice));

        let response = get(&h, "/api/quotes/NOPE").await;
        assert_eq!(response.status(), 404);
        assert_eq!(body_text(response).await, "Price not available");
        assert_eq!(h.provider.search_calls(), 1);
        assert_eq!(h.cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_missing_price_with_suggestions() {
        let h = harness(StubProvider::new().with_suggestions(
            "APPL",
            Ok(vec!["AAPL".into(), "APLE".into(), "APP".into()]),
        ));

        let response = get(&h, "/api/quotes/APPL").await;
        assert_eq!(response.status(), 200);
        assert_eq!(
            body_text(response).await,
            "Symbol not found - similar: AAPL APLE APP"
        );
        assert_eq!(h.cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_search_failure_is_swallowed() {
        let h = harness(
            StubProvider::new()
                .with_suggestions("ZZZZ", Err(UpstreamError::Transport("reset".into()))),
        );

        let response = get(&h, "/api/quotes/ZZZZ").await;
        assert_eq!(response.status(), 404);
        assert_eq!(body_text(response).await, "Price not available");
    }

    #[tokio::test]
    async fn test_suggestions_capped_at_three() {
        let candidates = ["A1", "A2", "A3", "A4", "A5"].map(String::from).to_vec();
        let h = harness(StubProvider::new().with_suggestions("AX", Ok(candidates)));

        let response = get(&h, "/api/quotes/AX").await;
        assert_eq!(response.status(), 200);
        assert_eq!(
            body_text(response).await,
            "Symbol not found - similar: A1 A2 A3"
        );
    }

    #[tokio::test]
    async fn test_upstream_failure_is_500_and_not_cached() {
        let h = harness(
            StubProvider::new().with_quote("AAPL", StubQuote::Fail(UpstreamError::Status(503))),
        );

        let response = get(&h, "/api/quotes/AAPL").await;
        assert_eq!(response.status(), 500);
        assert_eq!(response.headers()["Content-Type"], "text/plain");
        let body = body_text(response).await;
        assert!(body.starts_with("Error fetching quote"), "got: {body}");

        get(&h, "/api/quotes/AAPL").await;
        assert_eq!(h.provider.price_calls(), 2);
        assert_eq!(h.provider.search_calls(), 0);
    }

    #[tokio::test]
    async fn test_non_get_is_not_found() {
        let h = harness(StubProvider::new().with_quote("AAPL", StubQuote::Price(150.25)));

        let response = dispatch(&request(Method::POST, "/api/quotes/AAPL"), &h.state).await;
        assert_eq!(response.status(), 404);
        assert_eq!(body_text(response).await, "Not Found");
        assert_eq!(h.provider.price_calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let h = harness(StubProvider::new());
        let response = get(&h, "/api/other").await;
        assert_eq!(response.status(), 404);
        assert_eq!(response.headers()["Content-Type"], "text/plain");
        assert_eq!(body_text(response).await, "Not Found");
    }

    #[tokio::test]
    async fn test_root_redirect_configured() {
        let mut gateway = gateway_config();
        gateway.root_redirect_url = Some("https://example.com".to_string());
        let h = harness_with(gateway, StubProvider::new());

        let response = get(&h, "/").await;
        assert_eq!(response.status(), 301);
        assert_eq!(response.headers()["Location"], "https://example.com/");
    }

    #[tokio::test]
    async fn test_root_redirect_invalid_or_unset() {
        let mut gateway = gateway_config();
        gateway.root_redirect_url = Some("not-a-valid-url".to_string());
        let invalid = harness_with(gateway, StubProvider::new());
        assert_eq!(get(&invalid, "/").await.status(), 404);

        let unset = harness(StubProvider::new());
        assert_eq!(get(&unset, "/").await.status(), 404);
    }

    #[tokio::test]
    async fn test_configured_cache_ttl() {
        let mut gateway = gateway_config();
        gateway.cache_ttl = Some("600".to_string());
        let h = harness_with(
            gateway,
            StubProvider::new().with_quote("AAPL", StubQuote::Price(1.5)),
        );

        let response = get(&h, "/api/quotes/AAPL").await;
        assert_eq!(response.headers()["Cache-Control"], "public, max-age=600");
    }

    #[tokio::test]
    async fn test_exchange_prefix_redirects() {
        let h = harness(
            StubProvider::new()
                .with_quote("VWCE.MI", StubQuote::Price(120.4))
                .with_quote("BIT:VWCE", StubQuote::Price(1.0)),
        );

        let response = get(&h, "/api/quotes/BIT:VWCE").await;
        assert_eq!(response.status(), 301);
        assert_eq!(response.headers()["Location"], "/api/quotes/VWCE.MI");
        assert_eq!(h.provider.price_calls(), 1);
        assert_eq!(h.cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_exchange_probe_failure_falls_through() {
        let h = harness(
            StubProvider::new()
                .with_quote("ENI.MI", StubQuote::Fail(UpstreamError::Status(502)))
                .with_quote("bit:ENI", StubQuote::Price(14.2)),
        );

        let response = get(&h, "/api/quotes/bit:ENI").await;
        assert_eq!(response.status(), 200);
        assert_eq!(body_text(response).await, "14.2");
        assert_eq!(h.provider.price_calls(), 2);
    }
}
