use std::env;
use std::time::Duration;

/// Immutable pipeline configuration, constructed once at startup and passed
/// explicitly into each component. No component reads ambient state.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Minimum transaction price in HKD for an article to be worth reporting.
    pub min_price_hkd: i64,
    /// Minimum area in sqft, the complementary signal when no price is given.
    pub min_area_sqft: i64,

    /// Concurrent LLM calls for classification/extraction/ranking batches.
    pub llm_workers: usize,
    /// Per-call deadline; on expiry the component degrades to its fallback.
    pub llm_timeout: Duration,

    /// Token budgets per call type.
    pub classify_max_tokens: u32,
    pub extract_max_tokens: u32,
    pub summary_max_tokens: u32,
    pub similarity_max_tokens: u32,
    pub score_max_tokens: u32,

    /// Sampling temperatures per call type. Extraction and classification
    /// run near-deterministic; summarization gets a little latitude.
    pub classify_temperature: f32,
    pub extract_temperature: f32,
    pub summary_temperature: f32,
    pub similarity_temperature: f32,
    pub score_temperature: f32,

    /// News set ceiling; the relevance ranker only runs above this.
    pub news_target: usize,
    /// Never rank the kept set below this many items (if that many exist).
    pub news_floor: usize,
    /// Relevance scores below this are dropped from the kept band.
    pub relevance_cutoff: u8,

    /// Character-set overlap below which two topics skip the LLM similarity
    /// check. Empirically tuned; not load-bearing.
    pub topic_overlap_min: f64,

    /// Known publication names for tag-based source resolution.
    pub sources: Vec<String>,
    /// Placeholder when no source can be resolved.
    pub default_source: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_price_hkd: 20_000_000,
            min_area_sqft: 2_000,
            llm_workers: 10,
            llm_timeout: Duration::from_secs(20),
            classify_max_tokens: 50,
            extract_max_tokens: 1_000,
            summary_max_tokens: 500,
            similarity_max_tokens: 10,
            score_max_tokens: 10,
            classify_temperature: 0.1,
            extract_temperature: 0.1,
            summary_temperature: 0.3,
            similarity_temperature: 0.0,
            score_temperature: 0.0,
            news_target: 20,
            news_floor: 15,
            relevance_cutoff: 6,
            topic_overlap_min: 0.30,
            sources: vec![
                "信報".to_string(),
                "經濟日報".to_string(),
                "明報".to_string(),
                "星島日報".to_string(),
                "東方日報".to_string(),
                "文匯報".to_string(),
            ],
            default_source: "852.house".to_string(),
        }
    }
}

/// Credentials and endpoint for the LLM provider (OpenAI-compatible API).
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl LlmConfig {
    /// Load from environment variables.
    /// Panics with a clear message if the API key is missing.
    pub fn from_env() -> Self {
        Self {
            api_key: required_env("DEEPSEEK_API_KEY"),
            base_url: env::var("DEEPSEEK_API_BASE")
                .unwrap_or_else(|_| "https://api.deepseek.com/v1".to_string()),
            model: env::var("DEEPSEEK_MODEL").unwrap_or_else(|_| "deepseek-chat".to_string()),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
