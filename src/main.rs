use std::sync::Arc;

mod config;
mod handler;
mod http;
mod logger;
mod server;
mod upstream;

const DEFAULT_CONFIG_PATH: &str = "config";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // First argument overrides the config file path (without extension)
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::Config::load_from(&config_path)?;
    logger::init(&cfg)?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_reusable_listener(addr)?;
    let state = Arc::new(config::AppState::new(&cfg)?);

    logger::log_server_start(&addr, &cfg);
    logger::log_info(&format!(
        "[CONFIG] Cache TTL: {}s, root redirect: {}",
        state.settings.cache_ttl,
        state
            .settings
            .root_redirect
            .as_ref()
            .map_or("disabled", url::Url::as_str)
    ));

    let shutdown = Arc::new(server::ShutdownSignal::new());
    server::start_signal_handler(Arc::clone(&shutdown))?;

    server::start_server_loop(listener, state, shutdown).await
}
