//! Content enhancement module
//!
//! This module cleans extracted text and derives item metadata:
//! - AI cleanup through an OpenAI-compatible text-generation API
//! - A deterministic fallback used whenever the API is absent or fails
//! - Read-time estimation, always computed locally

mod client;
mod fallback;
mod response;

pub use client::{OpenAiClient, TextGenerator};
pub use fallback::{
    clean_text, detect_topics, estimate_difficulty, estimate_read_time, summarize,
};
pub use response::{parse_reply, AiReply};

use crate::config::EnhancerConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

const SYSTEM_PROMPT: &str = "You clean up text extracted from web pages and documents for a \
knowledge base. Remove navigation, ads, and formatting artifacts without changing the meaning. \
Reply with a JSON object with these keys: \"cleaned_content\" (string, markdown allowed), \
\"summary\" (at most two sentences), \"topics\" (array of up to 5 short topic names), and \
\"difficulty\" (one of \"beginner\", \"intermediate\", \"advanced\").";

/// Errors from the text-generation path
#[derive(Debug, Error)]
pub enum EnhanceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("API returned no content")]
    EmptyResponse,

    #[error("Malformed reply: {0}")]
    Malformed(String),
}

/// Reading difficulty of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "beginner" => Some(Self::Beginner),
            "intermediate" => Some(Self::Intermediate),
            "advanced" => Some(Self::Advanced),
            _ => None,
        }
    }

    /// Lenient parse for model output (case and surrounding space ignored)
    pub fn parse(s: &str) -> Option<Self> {
        Self::from_db_string(&s.trim().to_lowercase())
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Which path produced an item's enhancement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnhancementMethod {
    Ai,
    Fallback,
}

impl EnhancementMethod {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Ai => "ai",
            Self::Fallback => "fallback",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "ai" => Some(Self::Ai),
            "fallback" => Some(Self::Fallback),
            _ => None,
        }
    }
}

/// Cleaned content plus derived metadata for one item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Enhancement {
    pub cleaned_content: String,
    pub summary: String,
    pub topics: Vec<String>,
    pub read_time_minutes: u32,
    pub difficulty: Difficulty,
    pub method: EnhancementMethod,
}

/// Enhances extracted items, preferring the text-generation API
pub struct ContentEnhancer {
    generator: Option<Arc<dyn TextGenerator>>,
    max_input_chars: usize,
}

impl ContentEnhancer {
    /// Creates an enhancer around an optional generator
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, max_input_chars: usize) -> Self {
        Self {
            generator,
            max_input_chars,
        }
    }

    /// Creates an enhancer from configuration
    ///
    /// The API client is only built when the enhancer is enabled and the
    /// configured environment variable holds a key; otherwise every item
    /// takes the fallback path.
    pub fn from_config(config: &EnhancerConfig) -> Result<Self, EnhanceError> {
        let generator: Option<Arc<dyn TextGenerator>> = if !config.enabled {
            info!("Content enhancer disabled, using heuristics only");
            None
        } else if let Some(api_key) = config.api_key() {
            Some(Arc::new(OpenAiClient::new(config, api_key)?))
        } else {
            warn!(
                "{} is not set, using heuristics only",
                config.api_key_env
            );
            None
        };

        Ok(Self::new(generator, config.max_input_chars))
    }

    /// Returns true if items will be sent to the text-generation API
    pub fn uses_ai(&self) -> bool {
        self.generator.is_some()
    }

    /// Cleans `content` and derives its metadata
    ///
    /// Never fails: API errors and malformed replies fall back to the local
    /// heuristics. Read time is computed locally from the cleaned content
    /// on both paths.
    pub async fn enhance(&self, title: &str, content: &str) -> Enhancement {
        if let Some(generator) = &self.generator {
            match self.enhance_with_ai(generator.as_ref(), title, content).await {
                Ok(enhancement) => return enhancement,
                Err(e) => warn!("AI enhancement failed for '{}': {}, using fallback", title, e),
            }
        }

        fallback_enhancement(content)
    }

    async fn enhance_with_ai(
        &self,
        generator: &dyn TextGenerator,
        title: &str,
        content: &str,
    ) -> Result<Enhancement, EnhanceError> {
        let (input, truncated) = truncate_chars(content, self.max_input_chars);
        let prompt = format!("Title: {}\n\nContent:\n{}", title, input);

        debug!("Enhancing '{}' with {}", title, generator.model());
        let raw = generator.generate(SYSTEM_PROMPT, &prompt).await?;
        let reply = parse_reply(&raw)?;

        // The model only saw a prefix, so its rewrite would drop the rest
        let cleaned_content = if truncated {
            clean_text(content)
        } else {
            reply.cleaned_content
        };

        let summary = if reply.summary.is_empty() {
            summarize(&cleaned_content)
        } else {
            reply.summary
        };

        let topics = if reply.topics.is_empty() {
            detect_topics(&cleaned_content)
        } else {
            reply.topics
        };

        Ok(Enhancement {
            read_time_minutes: estimate_read_time(&cleaned_content),
            cleaned_content,
            summary,
            topics,
            difficulty: reply.difficulty,
            method: EnhancementMethod::Ai,
        })
    }
}

/// Enhancement computed entirely from local heuristics
pub fn fallback_enhancement(content: &str) -> Enhancement {
    let cleaned_content = clean_text(content);

    Enhancement {
        summary: summarize(&cleaned_content),
        topics: detect_topics(&cleaned_content),
        read_time_minutes: estimate_read_time(&cleaned_content),
        difficulty: estimate_difficulty(&cleaned_content),
        cleaned_content,
        method: EnhancementMethod::Fallback,
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => (&text[..index], true),
        None => (text, false),
    }
}
