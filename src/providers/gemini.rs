use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use super::http::{build_client, endpoint_url, send_json};
use super::llm::{ChatBackend, Completion};
use super::TokenUsage;

/// Gemini client for the generateContent API
#[derive(Debug)]
pub struct Gemini {
    client: Client,
    /// API key, sent in the x-goog-api-key header
    api_key: String,
    endpoint: String,
    model: String,
    temperature: f32,
}

/// generateContent request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

/// A role-tagged list of parts
#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

/// A text part
#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Sampling parameters
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    temperature: f32,
}

/// generateContent response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    pub usage_metadata: Option<GeminiUsage>,
}

/// One response candidate
#[derive(Debug, Deserialize)]
pub struct GeminiCandidate {
    #[serde(default)]
    pub content: Option<GeminiContent>,
}

/// Token usage metadata
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiUsage {
    #[serde(default)]
    pub prompt_token_count: u64,
    #[serde(default)]
    pub candidates_token_count: u64,
    #[serde(default)]
    pub total_token_count: Option<u64>,
    #[serde(default)]
    pub cached_content_token_count: Option<u64>,
}

impl GeminiContent {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![GeminiPart { text: Some(text.to_string()) }],
        }
    }
}

impl GeminiRequest {
    /// Build a single-turn request with a system instruction
    pub fn new(system_prompt: &str, user_prompt: &str, temperature: f32) -> Self {
        Self {
            system_instruction: Some(GeminiContent::text(None, system_prompt)),
            contents: vec![GeminiContent::text(Some("user"), user_prompt)],
            generation_config: Some(GenerationConfig { temperature }),
        }
    }
}

impl GeminiUsage {
    pub fn to_token_usage(&self) -> TokenUsage {
        TokenUsage {
            input_tokens: self.prompt_token_count,
            output_tokens: self.candidates_token_count,
            cached_tokens: self.cached_content_token_count.unwrap_or(0),
            total_tokens: self.total_token_count,
        }
    }
}

impl Gemini {
    /// Create a new Gemini client
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
        }
    }

    /// Send a generateContent request
    pub async fn complete_request(&self, request: GeminiRequest) -> Result<GeminiResponse, ProviderError> {
        let path = format!("v1beta/models/{}:generateContent", self.model);
        let url = endpoint_url(&self.endpoint, &path)?;

        let request = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request);

        send_json(request, "Gemini").await
    }

    /// Concatenate the text parts of the first candidate
    pub fn extract_text(response: &GeminiResponse) -> Option<String> {
        let content = response.candidates.first()?.content.as_ref()?;
        Some(content.parts.iter().filter_map(|p| p.text.as_deref()).collect())
    }
}

#[async_trait]
impl ChatBackend for Gemini {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<Completion, ProviderError> {
        let request = GeminiRequest::new(system_prompt, user_prompt, self.temperature);
        let response = self.complete_request(request).await?;

        let text = Self::extract_text(&response)
            .ok_or_else(|| ProviderError::ParseError("Gemini returned no candidates".to_string()))?;

        Ok(Completion {
            text,
            usage: response.usage_metadata.as_ref().map(GeminiUsage::to_token_usage),
        })
    }

    fn model(&self) -> &str {
        &self.model
    }
}
