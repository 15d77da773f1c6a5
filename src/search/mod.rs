pub mod unsplash;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

pub use unsplash::UnsplashClient;

pub const NO_DESCRIPTION: &str = "No description available";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageResult {
    pub url: String,
    pub description: String,
}

impl ImageResult {
    pub fn new(url: impl Into<String>, description: Option<String>) -> Self {
        let description = description
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| NO_DESCRIPTION.to_string());
        ImageResult {
            url: url.into(),
            description,
        }
    }
}

/// Photo search backend. Errors are reported, not hidden; callers decide how to degrade.
#[async_trait]
pub trait ImageSearcher: Send + Sync {
    async fn search_images(&self, query: &str, per_page: usize) -> Result<Vec<ImageResult>>;
}
