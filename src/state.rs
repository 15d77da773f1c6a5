use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::llm::GeminiClient;
use crate::pipeline::{Orchestrator, SearchSettings};
use crate::search::UnsplashClient;
use crate::utils::http::build_http_client;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(config: Arc<Config>, orchestrator: Orchestrator) -> Self {
        AppState {
            config,
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// Wires the Gemini and Unsplash clients over one shared HTTP client.
    pub fn from_config(config: Arc<Config>) -> Result<Self> {
        let client = build_http_client(config.http_timeout())?;
        let generator = Arc::new(GeminiClient::new(client.clone(), &config));
        let searcher = Arc::new(UnsplashClient::new(client, &config));
        let orchestrator =
            Orchestrator::new(generator, searcher, SearchSettings::from_config(&config));
        Ok(AppState::new(config, orchestrator))
    }
}
