pub mod gemini;
pub mod prompts;

use anyhow::Result;
use async_trait::async_trait;

pub use gemini::GeminiClient;

/// Expands a user prompt into a comma-delimited keyword blob.
#[async_trait]
pub trait KeywordGenerator: Send + Sync {
    async fn generate_keywords(&self, prompt: &str) -> Result<String>;
}
