use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::config::{Config, MAX_SEARCH_PAGE_SIZE};
use crate::search::{ImageResult, ImageSearcher};
use crate::utils::timing::log_upstream_timing;

const ORIENTATION: &str = "landscape";

#[derive(Debug, Deserialize)]
struct UnsplashSearchResponse {
    results: Option<Vec<UnsplashPhoto>>,
}

#[derive(Debug, Deserialize)]
struct UnsplashPhoto {
    urls: Option<UnsplashUrls>,
    alt_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UnsplashUrls {
    regular: Option<String>,
}

fn extract_results(payload: UnsplashSearchResponse) -> Vec<ImageResult> {
    let mut results = Vec::new();
    for photo in payload.results.unwrap_or_default() {
        let url = photo
            .urls
            .and_then(|urls| urls.regular)
            .unwrap_or_default();
        if url.trim().is_empty() {
            continue;
        }
        results.push(ImageResult::new(url, photo.alt_description));
    }
    results
}

#[derive(Debug, Clone)]
pub struct UnsplashClient {
    client: Client,
    access_key: String,
    endpoint: String,
    order_by: Option<String>,
}

impl UnsplashClient {
    pub fn new(client: Client, config: &Config) -> Self {
        UnsplashClient {
            client,
            access_key: config.unsplash_access_key.clone(),
            endpoint: config.unsplash_search_endpoint.clone(),
            order_by: config.unsplash_order_by.clone(),
        }
    }

    async fn fetch(&self, query: &str, per_page: usize) -> Result<Vec<ImageResult>> {
        let per_page = per_page.clamp(1, MAX_SEARCH_PAGE_SIZE).to_string();
        let mut params = vec![
            ("query", query),
            ("per_page", per_page.as_str()),
            ("orientation", ORIENTATION),
        ];
        if let Some(order_by) = self.order_by.as_deref() {
            params.push(("order_by", order_by));
        }

        let response = self
            .client
            .get(&self.endpoint)
            .header("Authorization", format!("Client-ID {}", self.access_key))
            .header("Accept-Version", "v1")
            .query(&params)
            .send()
            .await
            .map_err(|err| anyhow!("Unsplash request failed: {err}"))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Unsplash request failed with status {}",
                response.status()
            ));
        }

        let data: UnsplashSearchResponse = response
            .json()
            .await
            .map_err(|err| anyhow!("Invalid Unsplash response: {err}"))?;

        Ok(extract_results(data))
    }
}

#[async_trait]
impl ImageSearcher for UnsplashClient {
    async fn search_images(&self, query: &str, per_page: usize) -> Result<Vec<ImageResult>> {
        if self.access_key.is_empty() {
            return Err(anyhow!("UNSPLASH_ACCESS_KEY is not configured."));
        }
        if query.trim().is_empty() {
            return Err(anyhow!("query must not be empty"));
        }

        info!(
            "Calling Unsplash search endpoint {} with query: {}",
            self.endpoint, query
        );
        let metadata = json!({ "query": query, "per_page": per_page });
        log_upstream_timing("unsplash", "search_photos", "search_images", Some(metadata), || {
            self.fetch(query, per_page)
        })
        .await
    }
}
