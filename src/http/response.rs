//! HTTP response building module
//!
//! Provides builders for the gateway's responses. Every body is plain text.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;

use super::cache::CachePolicy;

const TEXT_PLAIN: &str = "text/plain";

/// Build 404 Not Found response
pub fn build_404_response() -> Response<Full<Bytes>> {
    build_text_response(404, "Not Found")
}

/// Build 301 redirect response
pub fn build_redirect_response(target: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(301)
        .header("Location", target)
        .header("Content-Type", TEXT_PLAIN)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("301", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build a plain-text response with the given status
pub fn build_text_response(status: u16, body: impl Into<String>) -> Response<Full<Bytes>> {
    let body = Bytes::from(body.into());
    Response::builder()
        .status(status)
        .header("Content-Type", TEXT_PLAIN)
        .body(Full::new(body.clone()))
        .unwrap_or_else(|e| {
            log_build_error(&status.to_string(), &e);
            Response::new(Full::new(body))
        })
}

/// Build a successful quote response carrying the cache policy
pub fn build_quote_response(body: String, policy: CachePolicy) -> Response<Full<Bytes>> {
    Response::builder()
        .status(200)
        .header("Content-Type", TEXT_PLAIN)
        .header("Cache-Control", policy.to_header_value())
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|e| {
            log_build_error("200", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
