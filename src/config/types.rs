use serde::Deserialize;

/// Main configuration structure for kb-ingest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub enhancer: EnhancerConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address the API listens on
    #[serde(rename = "bind-address", default = "default_bind_address")]
    pub bind_address: String,

    /// Largest accepted PDF upload, in bytes
    #[serde(rename = "max-upload-bytes", default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Extraction pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    /// A URL processed for the same team within this many days is not re-extracted
    #[serde(rename = "freshness-days", default = "default_freshness_days")]
    pub freshness_days: u32,

    /// Simulated delay between pipeline steps (milliseconds)
    #[serde(rename = "step-delay-ms", default = "default_step_delay_ms")]
    pub step_delay_ms: u64,

    /// Fetch generic blog pages instead of always using the template
    #[serde(rename = "fetch-pages", default = "default_true")]
    pub fetch_pages: bool,

    /// User agent sent when fetching pages
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Largest fetched page body that is parsed (bytes)
    #[serde(rename = "max-page-bytes", default = "default_max_page_bytes")]
    pub max_page_bytes: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            freshness_days: default_freshness_days(),
            step_delay_ms: default_step_delay_ms(),
            fetch_pages: true,
            user_agent: default_user_agent(),
            max_page_bytes: default_max_page_bytes(),
        }
    }
}

/// Content enhancer (text-generation API) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EnhancerConfig {
    /// Whether the AI cleanup step is attempted at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Base URL of an OpenAI-compatible API
    #[serde(rename = "api-base", default = "default_api_base")]
    pub api_base: String,

    /// Model name sent with each request
    #[serde(default = "default_model")]
    pub model: String,

    /// Name of the environment variable holding the API key
    #[serde(rename = "api-key-env", default = "default_api_key_env")]
    pub api_key_env: String,

    /// Request timeout for the text-generation API (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Content beyond this many characters is not sent to the API
    #[serde(rename = "max-input-chars", default = "default_max_input_chars")]
    pub max_input_chars: usize,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_base: default_api_base(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            max_input_chars: default_max_input_chars(),
        }
    }
}

impl EnhancerConfig {
    /// Reads the API key from the configured environment variable
    ///
    /// Empty values count as absent.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

fn default_bind_address() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}

fn default_freshness_days() -> u32 {
    7
}

fn default_step_delay_ms() -> u64 {
    400
}

fn default_true() -> bool {
    true
}

fn default_user_agent() -> String {
    format!("kb-ingest/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_page_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_input_chars() -> usize {
    12_000
}
