// Gateway settings module
// Resolves raw gateway configuration into validated, immutable settings

use thiserror::Error;
use url::Url;

use super::types::GatewayConfig;
use crate::logger;

pub const DEFAULT_CACHE_TTL: u32 = 300;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Reasons a raw gateway value is rejected during resolution
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("CACHE_TTL must be a non-negative integer number of seconds: '{value}'")]
    InvalidCacheTtl { value: String },
    #[error("ROOT_REDIRECT_URL is not a valid absolute URL: '{value}'")]
    InvalidRedirectUrl { value: String },
    #[error("ROOT_REDIRECT_URL must use http or https: '{value}'")]
    UnsupportedRedirectScheme { value: String },
}

/// Immutable settings passed into every request
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub cache_ttl: u32,
    pub root_redirect: Option<Url>,
    pub user_agent: String,
    pub chart_url: String,
    pub search_url: String,
    pub cache_max_entries: usize,
}

impl GatewaySettings {
    /// Resolve raw config, logging and falling back on every invalid value
    pub fn resolve(raw: &GatewayConfig) -> Self {
        let cache_ttl = match raw.cache_ttl.as_deref() {
            None => DEFAULT_CACHE_TTL,
            Some(value) => parse_cache_ttl(value).unwrap_or_else(|e| {
                logger::log_warning(&format!("{e}; using default {DEFAULT_CACHE_TTL}"));
                DEFAULT_CACHE_TTL
            }),
        };

        let root_redirect = raw
            .root_redirect_url
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .and_then(|value| match parse_redirect_url(value) {
                Ok(url) => Some(url),
                Err(e) => {
                    logger::log_warning(&format!("{e}; root redirect disabled"));
                    None
                }
            });

        let user_agent = raw
            .user_agent
            .clone()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        Self {
            cache_ttl,
            root_redirect,
            user_agent,
            chart_url: raw.chart_url.trim_end_matches('/').to_string(),
            search_url: raw.search_url.clone(),
            cache_max_entries: raw.cache_max_entries,
        }
    }
}

pub fn parse_cache_ttl(value: &str) -> Result<u32, SettingsError> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| SettingsError::InvalidCacheTtl {
            value: value.to_string(),
        })
}

pub fn parse_redirect_url(value: &str) -> Result<Url, SettingsError> {
    let url = Url::parse(value.trim()).map_err(|_| SettingsError::InvalidRedirectUrl {
        value: value.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(SettingsError::UnsupportedRedirectScheme {
            value: value.to_string(),
        }),
    }
}
