mod api;
mod config;
mod error;
mod upstream;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{credential, key_preview, AppConfig};
use crate::upstream::{DuneClient, ZeroExClient};

#[derive(Clone)]
pub struct AppState {
    pub zeroex: ZeroExClient,
    pub dune: DuneClient,
    pub config: Arc<AppConfig>,
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(api::create_router())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "earnwallet=info,earnwallet_query=info,tower_http=debug".into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .init();

    println!("================================================");
    println!("          EARN WALLET - Starting Up             ");
    println!("================================================");

    let config = AppConfig::load().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    println!("[CONFIG] Server: {}:{}", config.server.host, config.server.port);
    println!("[CONFIG] 0x API: {} ({})", config.zeroex.api_url, config.zeroex.api_version);
    if credential(&config.zeroex.api_key).is_none() {
        println!("[CONFIG] 0x API Key: *** EMPTY - PLEASE SET OX_API_KEY ***");
    } else {
        println!("[CONFIG] 0x API Key: {}", key_preview(&config.zeroex.api_key));
    }
    println!("[CONFIG] Dune Sim API: {}", config.dune.api_url);
    if credential(&config.dune.api_key).is_none() {
        println!("[CONFIG] Dune API Key: *** EMPTY - PLEASE SET DUNE_API_KEY ***");
    } else {
        println!("[CONFIG] Dune API Key: {}", key_preview(&config.dune.api_key));
    }
    println!("[CONFIG] Transactions contract: {}", config.dune.contract_address);

    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        "Starting Earn Wallet server"
    );

    let state = AppState {
        zeroex: ZeroExClient::new(&config.zeroex)?,
        dune: DuneClient::new(&config.dune)?,
        config: Arc::new(config.clone()),
    };

    println!("[ROUTER] Setting up API routes...");
    let app = build_app(state);
    println!("[ROUTER] Routes configured: /health, /api/quote, /api/transactions");

    let addr: SocketAddr = config.server_addr().parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    println!("================================================");
    println!("  Server listening on http://{}", addr);
    println!("================================================");
    println!();

    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
