use std::env;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tracing::warn;
use url::Url;

use crate::llm::prompts::KeywordPromptStyle;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_UNSPLASH_ENDPOINT: &str = "https://api.unsplash.com/search/photos";
pub const MAX_IMAGE_OUTPUT_SIZE: usize = 5;
pub const MAX_SEARCH_PAGE_SIZE: usize = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_dir: String,
    pub cors_allowed_origins: Vec<String>,
    pub http_timeout_seconds: u64,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub gemini_temperature: f32,
    pub gemini_top_k: i32,
    pub gemini_top_p: f32,
    pub gemini_max_output_tokens: i32,
    pub keyword_prompt_style: KeywordPromptStyle,
    pub unsplash_access_key: String,
    pub unsplash_search_endpoint: String,
    pub unsplash_order_by: Option<String>,
    /// Leading keywords appended to the prompt; zero keeps all of them.
    pub keyword_limit: usize,
    pub search_page_size: usize,
    pub image_output_size: usize,
}

/// Reads typed settings from a variable lookup, falling back to defaults.
struct EnvSource<F> {
    lookup: F,
}

impl<F> EnvSource<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn raw(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
    }

    fn string(&self, name: &str, default: &str) -> String {
        self.raw(name).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T: std::str::FromStr>(&self, name: &str, default: T) -> T {
        self.raw(name)
            .and_then(|value| value.trim().parse::<T>().ok())
            .unwrap_or(default)
    }

    fn csv(&self, name: &str, default: &str) -> Vec<String> {
        self.string(name, default)
            .split(',')
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .collect()
    }

    fn first_non_empty(&self, names: &[&str]) -> String {
        names
            .iter()
            .filter_map(|name| self.raw(name))
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
            .unwrap_or_default()
    }
}

fn normalize_order_by(value: String) -> Option<String> {
    let trimmed = value.trim().to_lowercase();
    match trimmed.as_str() {
        "" | "none" => None,
        "relevant" | "latest" => Some(trimmed),
        _ => {
            warn!(
                "Unknown UNSPLASH_ORDER_BY value '{}'; defaulting to relevant.",
                value
            );
            Some("relevant".to_string())
        }
    }
}

fn normalize_prompt_style(value: String) -> KeywordPromptStyle {
    value.parse::<KeywordPromptStyle>().unwrap_or_else(|_| {
        warn!(
            "Unknown KEYWORD_PROMPT_STYLE value '{}'; defaulting to structured.",
            value
        );
        KeywordPromptStyle::Structured
    })
}

fn validate_endpoint(name: &str, value: &str) -> Result<()> {
    Url::parse(value).map_err(|err| anyhow!("{name} is not a valid URL ({value}): {err}"))?;
    Ok(())
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvSource { lookup };
        let port = env.string("PORT", "5000");
        let port = port
            .trim()
            .parse::<u16>()
            .map_err(|_| anyhow!("Invalid PORT value: {port}"))?;

        let config = Config {
            host: env.string("HOST", "0.0.0.0"),
            port,
            log_level: env.string("LOG_LEVEL", "info"),
            log_dir: env.string("LOG_DIR", "logs"),
            cors_allowed_origins: env.csv("CORS_ALLOWED_ORIGINS", "*"),
            http_timeout_seconds: env.parsed("HTTP_TIMEOUT_SECONDS", 10u64).max(1),
            gemini_api_key: env.first_non_empty(&["API_KEY", "GEMINI_API_KEY"]),
            gemini_model: env.string("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
            gemini_base_url: env
                .string("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            gemini_temperature: env.parsed("GEMINI_TEMPERATURE", 0.7f32),
            gemini_top_k: env.parsed("GEMINI_TOP_K", 40i32),
            gemini_top_p: env.parsed("GEMINI_TOP_P", 0.95f32),
            gemini_max_output_tokens: env.parsed("GEMINI_MAX_OUTPUT_TOKENS", 256i32),
            keyword_prompt_style: normalize_prompt_style(
                env.string("KEYWORD_PROMPT_STYLE", "structured"),
            ),
            unsplash_access_key: env.string("UNSPLASH_ACCESS_KEY", "").trim().to_string(),
            unsplash_search_endpoint: env
                .string("UNSPLASH_SEARCH_ENDPOINT", DEFAULT_UNSPLASH_ENDPOINT),
            unsplash_order_by: normalize_order_by(env.string("UNSPLASH_ORDER_BY", "relevant")),
            keyword_limit: env.parsed("KEYWORD_LIMIT", 3usize),
            search_page_size: env
                .parsed("SEARCH_PAGE_SIZE", 10usize)
                .clamp(1, MAX_SEARCH_PAGE_SIZE),
            image_output_size: env
                .parsed("IMAGE_OUTPUT_SIZE", MAX_IMAGE_OUTPUT_SIZE)
                .clamp(1, MAX_IMAGE_OUTPUT_SIZE),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.gemini_api_key.is_empty() {
            return Err(anyhow!("API_KEY (or GEMINI_API_KEY) is required."));
        }
        validate_endpoint("GEMINI_BASE_URL", &self.gemini_base_url)?;
        validate_endpoint("UNSPLASH_SEARCH_ENDPOINT", &self.unsplash_search_endpoint)?;
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn allows_any_origin(&self) -> bool {
        self.cors_allowed_origins.is_empty()
            || self.cors_allowed_origins.iter().any(|origin| origin == "*")
    }
}

#[cfg(test)]
impl Config {
    /// Fixed configuration for tests; never touches the process environment.
    pub fn for_tests() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            log_level: "debug".to_string(),
            log_dir: "logs".to_string(),
            cors_allowed_origins: vec!["*".to_string()],
            http_timeout_seconds: 5,
            gemini_api_key: "test-gemini-key".to_string(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            gemini_temperature: 0.7,
            gemini_top_k: 40,
            gemini_top_p: 0.95,
            gemini_max_output_tokens: 256,
            keyword_prompt_style: KeywordPromptStyle::Structured,
            unsplash_access_key: "test-unsplash-key".to_string(),
            unsplash_search_endpoint: DEFAULT_UNSPLASH_ENDPOINT.to_string(),
            unsplash_order_by: Some("relevant".to_string()),
            keyword_limit: 3,
            search_page_size: 10,
            image_output_size: MAX_IMAGE_OUTPUT_SIZE,
        }
    }
}
