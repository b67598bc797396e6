/*!
 * Anthropic Messages API backend.
 */

use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use super::http::{build_client, endpoint_url, send_json};
use super::llm::{ChatBackend, Completion};
use super::TokenUsage;

/// Value of the `anthropic-version` header
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Messages API client
#[derive(Debug)]
pub struct Anthropic {
    client: Client,
    api_key: String,
    /// Base URL, without the `v1/messages` path
    endpoint: String,
    model: String,
    temperature: f32,
    /// Response length cap sent with every request
    max_tokens: u32,
}

/// Body of a `POST v1/messages` call
#[derive(Debug, Serialize)]
pub struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    // The system prompt is a top-level field, not a message
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_tokens: u32,
}

/// One conversation turn
#[derive(Debug, Serialize, Deserialize)]
pub struct AnthropicMessage {
    /// `user` or `assistant`
    pub role: String,
    pub content: String,
}

/// `usage` object of a response
#[derive(Debug, Deserialize)]
pub struct AnthropicUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Prompt tokens served from the cache
    #[serde(default)]
    pub cache_read_input_tokens: Option<u64>,
}

/// Messages API response, reduced to the fields we read
#[derive(Debug, Deserialize)]
pub struct AnthropicResponse {
    pub content: Vec<AnthropicContent>,
    #[serde(default)]
    pub usage: Option<AnthropicUsage>,
}

/// A content block; only `text` blocks carry translations
#[derive(Debug, Deserialize)]
pub struct AnthropicContent {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub text: String,
}

impl AnthropicRequest {
    pub fn new(model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            system: None,
            temperature: None,
            max_tokens,
        }
    }

    /// Append a turn
    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(AnthropicMessage {
            role: role.into(),
            content: content.into(),
        });
        self
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

impl AnthropicUsage {
    pub fn to_token_usage(&self) -> TokenUsage {
        TokenUsage {
            input_tokens: self.input_tokens,
            output_tokens: self.output_tokens,
            cached_tokens: self.cache_read_input_tokens.unwrap_or(0),
            total_tokens: None,
        }
    }
}

impl Anthropic {
    /// Client for `endpoint`, e.g. `https://api.anthropic.com`
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
        timeout: Duration,
    ) -> Self {
        Self {
            client: build_client(timeout),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            model: model.into(),
            temperature,
            max_tokens: 4096,
        }
    }

    /// Send one request and decode the response
    pub async fn complete_request(&self, request: AnthropicRequest) -> Result<AnthropicResponse, ProviderError> {
        let url = endpoint_url(&self.endpoint, "v1/messages")?;

        let request = self
            .client
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request);

        send_json(request, "Anthropic").await
    }

    /// Concatenate the text blocks of a response
    pub fn extract_text(response: &AnthropicResponse) -> String {
        response
            .content
            .iter()
            .filter(|c| c.content_type == "text")
            .map(|c| c.text.as_str())
            .collect()
    }
}

#[async_trait]
impl ChatBackend for Anthropic {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<Completion, ProviderError> {
        let request = AnthropicRequest::new(&self.model, self.max_tokens)
            .system(system_prompt)
            .add_message("user", user_prompt)
            .temperature(self.temperature);

        let response = self.complete_request(request).await?;

        Ok(Completion {
            text: Self::extract_text(&response),
            usage: response.usage.as_ref().map(AnthropicUsage::to_token_usage),
        })
    }

    fn model(&self) -> &str {
        &self.model
    }
}
