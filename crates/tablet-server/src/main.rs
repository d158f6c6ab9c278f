use std::net::SocketAddr;
use std::sync::Arc;

use tablet_engine::{Engine, MiniParser};
use tablet_server::{router, AppState, ServerConfig};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = load_config().apply_env_overrides();
    configure_tracing(&config.log_level);

    let addr: SocketAddr = config.bind_addr.parse().expect("bind_addr must be a valid socket address");
    let state = Arc::new(AppState { registry: Default::default(), engine: Engine::default(), parser: MiniParser });

    tracing::info!(%addr, "starting tablet server");
    let listener = tokio::net::TcpListener::bind(addr).await.expect("failed to bind listener");
    axum::serve(listener, router(state)).await.expect("server error");
}

fn load_config() -> ServerConfig {
    let path = std::env::var("TABLET_CONFIG").unwrap_or_else(|_| "tablet-server.toml".to_string());
    match std::fs::read_to_string(&path) {
        Ok(src) => ServerConfig::from_toml(&src).unwrap_or_else(|e| {
            eprintln!("failed to parse {path}: {e}, falling back to defaults");
            ServerConfig::default()
        }),
        Err(_) => ServerConfig::default(),
    }
}

fn configure_tracing(level: &str) {
    let env_filter = EnvFilter::builder().with_default_directive(tracing::Level::INFO.into()).parse_lossy(level);
    let fmt_layer = tracing_subscriber::fmt::Layer::default().with_target(false);
    tracing_subscriber::Registry::default().with(fmt_layer).with(env_filter).init();
}
