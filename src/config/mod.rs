// Configuration module entry point
// Manages application configuration, gateway settings, and runtime state

mod settings;
mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use settings::GatewaySettings;
pub use state::AppState;
pub use types::{Config, GatewayConfig, LoggingConfig, PerformanceConfig, ServerConfig};

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "config.toml" when no path specified
    ///
    /// The bare `CACHE_TTL`, `ROOT_REDIRECT_URL` and `USER_AGENT` environment
    /// variables take precedence over the `[gateway]` section.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("SERVER"))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default(
                "gateway.chart_url",
                "https://query1.finance.yahoo.com/v8/finance/chart",
            )?
            .set_default(
                "gateway.search_url",
                "https://query2.finance.yahoo.com/v1/finance/search",
            )?
            .set_default("gateway.cache_max_entries", 10_000)?
            .set_override_option("gateway.cache_ttl", std::env::var("CACHE_TTL").ok())?
            .set_override_option(
                "gateway.root_redirect_url",
                std::env::var("ROOT_REDIRECT_URL").ok(),
            )?
            .set_override_option("gateway.user_agent", std::env::var("USER_AGENT").ok())?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_defaults_without_file() {
        let config = Config::load_from("does-not-exist/quote-gateway").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.access_log_format, "combined");
        assert_eq!(config.gateway.cache_max_entries, 10_000);
        assert!(config.gateway.chart_url.ends_with("/v8/finance/chart"));
        assert_eq!(
            config.get_socket_addr().unwrap(),
            "127.0.0.1:8080".parse().unwrap()
        );
    }
}
