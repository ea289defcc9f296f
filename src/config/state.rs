// Application state module
// Holds resolved settings and the shared collaborators of the gateway

use std::sync::atomic::{AtomicBool, AtomicUsize};
use std::sync::Arc;

use super::settings::GatewaySettings;
use super::types::Config;
use crate::handler::DeferredTasks;
use crate::http::cache::{MemoryCache, ResponseCache};
use crate::upstream::{QuoteProvider, YahooProvider};

/// Application state
pub struct AppState {
    pub config: Config,
    pub settings: Arc<GatewaySettings>,
    pub provider: Arc<dyn QuoteProvider>,
    pub cache: Arc<dyn ResponseCache>,
    pub deferred: DeferredTasks,

    // Cached config values for fast access without locks
    pub cached_access_log: Arc<AtomicBool>,
    pub active_connections: Arc<AtomicUsize>,
}

impl AppState {
    /// Build state with the production provider and in-memory edge cache
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let settings = GatewaySettings::resolve(&config.gateway);
        let provider = YahooProvider::new(&settings)?;
        let cache = MemoryCache::new(settings.cache_max_entries);
        Ok(Self::with_parts(
            config,
            settings,
            Arc::new(provider),
            Arc::new(cache),
        ))
    }

    pub fn with_parts(
        config: &Config,
        settings: GatewaySettings,
        provider: Arc<dyn QuoteProvider>,
        cache: Arc<dyn ResponseCache>,
    ) -> Self {
        Self {
            config: config.clone(),
            settings: Arc::new(settings),
            provider,
            cache,
            deferred: DeferredTasks::new(),
            cached_access_log: Arc::new(AtomicBool::new(config.logging.access_log)),
            active_connections: Arc::new(AtomicUsize::new(0)),
        }
    }
}
