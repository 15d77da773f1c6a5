use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::{Config, MAX_IMAGE_OUTPUT_SIZE};
use crate::errors::ApiError;
use crate::llm::KeywordGenerator;
use crate::pipeline::keywords::{build_search_query, parse_keywords};
use crate::pipeline::sampling::sample_results;
use crate::search::{ImageResult, ImageSearcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSettings {
    pub keyword_limit: usize,
    pub page_size: usize,
    pub output_size: usize,
}

impl SearchSettings {
    pub fn from_config(config: &Config) -> Self {
        SearchSettings {
            keyword_limit: config.keyword_limit,
            page_size: config.search_page_size,
            output_size: config.image_output_size.min(MAX_IMAGE_OUTPUT_SIZE),
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        SearchSettings {
            keyword_limit: 3,
            page_size: 10,
            output_size: MAX_IMAGE_OUTPUT_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    /// Generator text as returned, trimmed but not split.
    pub keywords: String,
    pub images: Vec<ImageResult>,
}

#[derive(Debug, Clone, Copy)]
enum SearchAttempt {
    Primary,
    Fallback,
}

impl SearchAttempt {
    fn as_str(self) -> &'static str {
        match self {
            SearchAttempt::Primary => "primary",
            SearchAttempt::Fallback => "fallback",
        }
    }
}

/// Turns a prompt into images: one keyword generation, one enriched search,
/// at most one prompt-only retry, then sampling down to the output size.
pub struct Orchestrator {
    generator: Arc<dyn KeywordGenerator>,
    searcher: Arc<dyn ImageSearcher>,
    settings: SearchSettings,
}

impl Orchestrator {
    pub fn new(
        generator: Arc<dyn KeywordGenerator>,
        searcher: Arc<dyn ImageSearcher>,
        settings: SearchSettings,
    ) -> Self {
        Orchestrator {
            generator,
            searcher,
            settings,
        }
    }

    pub async fn build_and_search(&self, prompt: &str) -> Result<GenerationOutcome, ApiError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ApiError::Validation("Prompt is required".to_string()));
        }

        let generated = self
            .generator
            .generate_keywords(prompt)
            .await
            .map_err(|err| {
                error!("Keyword generation failed for prompt {:?}: {:#}", prompt, err);
                ApiError::UpstreamGeneration(err.to_string())
            })?;
        let generated = generated.trim().to_string();

        let keywords = parse_keywords(&generated);
        let query = build_search_query(prompt, &keywords, self.settings.keyword_limit);
        info!(
            "Generated {} keywords for prompt {:?}; search query: {:?}",
            keywords.len(),
            prompt,
            query
        );

        let mut images = self.search_or_empty(&query, SearchAttempt::Primary).await;
        if images.is_empty() {
            info!("No images for enriched query; retrying with prompt only");
            images = self.search_or_empty(prompt, SearchAttempt::Fallback).await;
        }

        let found = images.len();
        let images = sample_results(images, self.settings.output_size, &mut rand::thread_rng());
        info!("Returning {} of {} images", images.len(), found);

        Ok(GenerationOutcome {
            keywords: generated,
            images,
        })
    }

    async fn search_or_empty(&self, query: &str, attempt: SearchAttempt) -> Vec<ImageResult> {
        match self
            .searcher
            .search_images(query, self.settings.page_size)
            .await
        {
            Ok(images) => images,
            Err(err) => {
                warn!(
                    "Image search ({}) failed for query {:?}; treating as no results: {:#}",
                    attempt.as_str(),
                    query,
                    err
                );
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::{HashSet, VecDeque};
    use std::sync::Mutex;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    pub(crate) struct StubGenerator {
        response: std::result::Result<String, String>,
        pub(crate) prompts: Mutex<Vec<String>>,
    }

    impl StubGenerator {
        pub(crate) fn ok(text: &str) -> Self {
            StubGenerator {
                response: Ok(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing(message: &str) -> Self {
            StubGenerator {
                response: Err(message.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl KeywordGenerator for StubGenerator {
        async fn generate_keywords(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.response.clone().map_err(|message| anyhow!(message))
        }
    }

    /// Replays queued responses in order; an exhausted queue yields empty pages.
    pub(crate) struct StubSearcher {
        responses: Mutex<VecDeque<Result<Vec<ImageResult>>>>,
        pub(crate) queries: Mutex<Vec<(String, usize)>>,
    }

    impl StubSearcher {
        pub(crate) fn new(responses: Vec<Result<Vec<ImageResult>>>) -> Self {
            StubSearcher {
                responses: Mutex::new(responses.into_iter().collect()),
                queries: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn queries(&self) -> Vec<String> {
            self.queries
                .lock()
                .unwrap()
                .iter()
                .map(|(query, _)| query.clone())
                .collect()
        }
    }

    #[async_trait]
    impl ImageSearcher for StubSearcher {
        async fn search_images(&self, query: &str, per_page: usize) -> Result<Vec<ImageResult>> {
            self.queries
                .lock()
                .unwrap()
                .push((query.to_string(), per_page));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    pub(crate) fn images(count: usize) -> Vec<ImageResult> {
        (0..count)
            .map(|index| ImageResult::new(format!("https://img/{index}"), None))
            .collect()
    }

    fn orchestrator(
        generator: &Arc<StubGenerator>,
        searcher: &Arc<StubSearcher>,
    ) -> Orchestrator {
        Orchestrator::new(
            generator.clone(),
            searcher.clone(),
            SearchSettings::default(),
        )
    }

    #[tokio::test]
    async fn enriched_query_uses_prompt_and_top_keywords() {
        let generator = Arc::new(StubGenerator::ok("red, sunset, ocean"));
        let searcher = Arc::new(StubSearcher::new(vec![Ok(images(3))]));

        let outcome = orchestrator(&generator, &searcher)
            .build_and_search("beach day")
            .await
            .unwrap();

        assert_eq!(searcher.queries(), vec!["beach day red sunset ocean"]);
        assert_eq!(searcher.queries.lock().unwrap()[0].1, 10);
        assert_eq!(outcome.keywords, "red, sunset, ocean");
        assert_eq!(outcome.images, images(3));
    }

    #[tokio::test]
    async fn empty_primary_triggers_one_prompt_only_fallback() {
        let generator = Arc::new(StubGenerator::ok("neon, rain, skyscraper, night"));
        let searcher = Arc::new(StubSearcher::new(vec![Ok(Vec::new()), Ok(images(4))]));

        let outcome = orchestrator(&generator, &searcher)
            .build_and_search("cyberpunk city")
            .await
            .unwrap();

        assert_eq!(
            searcher.queries(),
            vec!["cyberpunk city neon rain skyscraper", "cyberpunk city"]
        );
        assert_eq!(outcome.images, images(4));
    }

    #[tokio::test]
    async fn fallback_is_attempted_at_most_once() {
        let generator = Arc::new(StubGenerator::ok("fog"));
        let searcher = Arc::new(StubSearcher::new(vec![Ok(Vec::new()), Ok(Vec::new())]));

        let outcome = orchestrator(&generator, &searcher)
            .build_and_search("lighthouse")
            .await
            .unwrap();

        assert_eq!(searcher.queries(), vec!["lighthouse fog", "lighthouse"]);
        assert!(outcome.images.is_empty());
    }

    #[tokio::test]
    async fn search_failures_degrade_to_empty_results() {
        let generator = Arc::new(StubGenerator::ok("snow, peaks"));
        let searcher = Arc::new(StubSearcher::new(vec![
            Err(anyhow!("connection reset")),
            Err(anyhow!("status 503")),
        ]));

        let outcome = orchestrator(&generator, &searcher)
            .build_and_search("alps")
            .await
            .unwrap();

        assert_eq!(searcher.queries().len(), 2);
        assert!(outcome.images.is_empty());
        assert_eq!(outcome.keywords, "snow, peaks");
    }

    #[tokio::test]
    async fn failed_primary_recovers_through_fallback() {
        let generator = Arc::new(StubGenerator::ok("snow"));
        let searcher = Arc::new(StubSearcher::new(vec![
            Err(anyhow!("timeout")),
            Ok(images(2)),
        ]));

        let outcome = orchestrator(&generator, &searcher)
            .build_and_search("alps")
            .await
            .unwrap();

        assert_eq!(searcher.queries(), vec!["alps snow", "alps"]);
        assert_eq!(outcome.images.len(), 2);
    }

    #[tokio::test]
    async fn large_pages_are_sampled_down_to_five_distinct() {
        let generator = Arc::new(StubGenerator::ok("a, b"));
        let searcher = Arc::new(StubSearcher::new(vec![Ok(images(10))]));

        let outcome = orchestrator(&generator, &searcher)
            .build_and_search("letters")
            .await
            .unwrap();

        assert_eq!(searcher.queries().len(), 1);
        assert_eq!(outcome.images.len(), 5);
        let urls: HashSet<_> = outcome.images.iter().map(|image| &image.url).collect();
        assert_eq!(urls.len(), 5);
        let source = images(10);
        assert!(outcome.images.iter().all(|image| source.contains(image)));
    }

    #[tokio::test]
    async fn blank_prompt_is_rejected_before_any_call() {
        let generator = Arc::new(StubGenerator::ok("unused"));
        let searcher = Arc::new(StubSearcher::new(Vec::new()));

        let err = orchestrator(&generator, &searcher)
            .build_and_search("   ")
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(generator.calls(), 0);
        assert!(searcher.queries().is_empty());
    }

    #[tokio::test]
    async fn generation_failure_skips_search() {
        let generator = Arc::new(StubGenerator::failing("quota exhausted"));
        let searcher = Arc::new(StubSearcher::new(vec![Ok(images(5))]));

        let err = orchestrator(&generator, &searcher)
            .build_and_search("forest")
            .await
            .unwrap_err();

        match err {
            ApiError::UpstreamGeneration(message) => assert!(message.contains("quota exhausted")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(searcher.queries().is_empty());
    }

    #[tokio::test]
    async fn prompt_is_trimmed_before_generation_and_search() {
        let generator = Arc::new(StubGenerator::ok(" ,river, "));
        let searcher = Arc::new(StubSearcher::new(vec![Ok(images(1))]));

        orchestrator(&generator, &searcher)
            .build_and_search("  valley \n")
            .await
            .unwrap();

        assert_eq!(generator.prompts.lock().unwrap().clone(), vec!["valley"]);
        assert_eq!(searcher.queries(), vec!["valley river"]);
    }

    #[test]
    fn settings_never_exceed_five_outputs() {
        let mut config = Config::for_tests();
        config.image_output_size = 9;
        config.keyword_limit = 4;
        let settings = SearchSettings::from_config(&config);
        assert_eq!(settings.output_size, 5);
        assert_eq!(settings.keyword_limit, 4);
    }
}
