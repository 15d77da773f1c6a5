use std::sync::Arc;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

mod config;
mod errors;
mod handlers;
mod llm;
mod pipeline;
mod search;
mod state;
mod utils;

use config::Config;
use handlers::build_router;
use state::AppState;
use utils::logging::init_logging;

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {err}");
        return;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let config = Arc::new(Config::load()?);
    let _guards = init_logging(&config);

    info!(
        "Starting prompt image finder (model={}, prompt_style={}, keyword_limit={}, page_size={}, output_size={})",
        config.gemini_model,
        config.keyword_prompt_style.as_str(),
        config.keyword_limit,
        config.search_page_size,
        config.image_output_size
    );
    if config.unsplash_access_key.is_empty() {
        warn!("UNSPLASH_ACCESS_KEY is not configured; image searches will return no results.");
    }

    let state = AppState::from_config(config.clone())?;
    let app = build_router(state);

    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server stopped");
    Ok(())
}
