//! Text-generation client
//!
//! Talks to any OpenAI-compatible chat completions endpoint.

use crate::config::EnhancerConfig;
use crate::enhance::EnhanceError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Sampling temperature for cleanup requests
const TEMPERATURE: f32 = 0.2;

/// Anything that can answer a system + user prompt pair
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generates a completion for `prompt` under the `system` instructions
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, EnhanceError>;

    /// Model name for logging
    fn model(&self) -> &str;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat completions API
pub struct OpenAiClient {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    /// Creates a client from the enhancer configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Enhancer configuration (endpoint, model, timeout)
    /// * `api_key` - Bearer token sent with every request
    pub fn new(config: &EnhancerConfig, api_key: String) -> Result<Self, EnhanceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let api_base = config.api_base.trim_end_matches('/').to_string();
        info!(
            "Text generation configured: endpoint={}, model={}",
            api_base, config.model
        );

        Ok(Self {
            client,
            api_base,
            api_key,
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, EnhanceError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: TEMPERATURE,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EnhanceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = response.json().await?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(EnhanceError::EmptyResponse)?;

        debug!("Received {} chars from {}", content.len(), self.model);
        Ok(content)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
