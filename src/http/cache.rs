//! HTTP response cache module
//!
//! Provides the cache-control policy for quote responses, the cache key
//! derived from a request, and the edge-local response cache.

use async_trait::async_trait;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderMap, CACHE_CONTROL};
use hyper::{Method, Response, StatusCode};
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::logger;

/// Cache control policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Public cache with specified max-age (seconds)
    Public(u32),
}

impl CachePolicy {
    /// Convert to Cache-Control header value
    pub fn to_header_value(self) -> String {
        match self {
            Self::Public(max_age) => format!("public, max-age={max_age}"),
        }
    }
}

/// Extract `max-age` seconds from a Cache-Control header value
///
/// Returns `None` when the directive is absent, malformed, or overridden by
/// `no-store`.
pub fn parse_max_age(cache_control: &str) -> Option<u64> {
    let mut max_age = None;
    for directive in cache_control.split(',').map(str::trim) {
        if directive.eq_ignore_ascii_case("no-store") {
            return None;
        }
        if let Some(value) = directive.strip_prefix("max-age=") {
            max_age = value.trim_matches('"').parse().ok();
        }
    }
    max_age
}

/// Normalized request identity: method, host and path, never the query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn from_request(method: &Method, host: Option<&str>, path: &str) -> Self {
        Self(format!("{method} {}{path}", host.unwrap_or_default()))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Owned copy of a response, as kept in the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CachedResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Freshness lifetime advertised by the stored Cache-Control header
    pub fn max_age(&self) -> Option<Duration> {
        self.headers
            .get(CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_max_age)
            .map(Duration::from_secs)
    }

    pub fn into_response(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Key/value store of HTTP responses
///
/// Implementations are treated as atomic per key; callers never lock around
/// them.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn lookup(&self, key: &CacheKey) -> Option<CachedResponse>;
    async fn store(&self, key: CacheKey, response: CachedResponse);
}

struct CacheEntry {
    response: CachedResponse,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Process-local response cache honoring each entry's `max-age`
pub struct MemoryCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    max_entries: usize,
}

impl MemoryCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries,
        }
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Make room for one new key: drop expired entries, then the entry
    /// closest to expiry
    fn evict_for_insert(entries: &mut HashMap<CacheKey, CacheEntry>, max: usize, now: Instant) {
        if entries.len() < max {
            return;
        }
        entries.retain(|_, entry| !entry.is_expired(now));
        if entries.len() < max {
            return;
        }
        let oldest = entries
            .iter()
            .min_by_key(|(_, entry)| entry.expires_at)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            logger::log_debug(&format!("[Cache] Evicting {key}"));
            entries.remove(&key);
        }
    }
}

#[async_trait]
impl ResponseCache for MemoryCache {
    async fn lookup(&self, key: &CacheKey) -> Option<CachedResponse> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired(now) => return Some(entry.response.clone()),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
        }
        None
    }

    async fn store(&self, key: CacheKey, response: CachedResponse) {
        if self.max_entries == 0 {
            return;
        }
        let Some(max_age) = response.max_age() else {
            logger::log_debug(&format!("[Cache] Not storing {key}: no max-age"));
            return;
        };

        let now = Instant::now();
        let mut entries = self.entries.write().await;
        if !entries.contains_key(&key) {
            Self::evict_for_insert(&mut entries, self.max_entries, now);
        }
        entries.insert(
            key,
            CacheEntry {
                response,
                expires_at: now + max_age,
            },
        );
    }
}
