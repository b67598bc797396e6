use std::time::Duration;
use async_trait::async_trait;

use crate::errors::ProviderError;
use super::llm::{ChatBackend, Completion};
use super::openai::OpenAI;

/// Kimi (Moonshot) client. The API speaks the OpenAI chat-completions dialect
/// with bearer authentication, so requests go through the OpenAI client.
#[derive(Debug)]
pub struct Kimi {
    inner: OpenAI,
}

impl Kimi {
    /// Create a new Kimi client
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
        timeout: Duration,
    ) -> Self {
        Self {
            inner: OpenAI::new(api_key, endpoint, model, temperature, timeout).with_label("Kimi"),
        }
    }
}

#[async_trait]
impl ChatBackend for Kimi {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<Completion, ProviderError> {
        self.inner.complete(system_prompt, user_prompt).await
    }

    fn model(&self) -> &str {
        self.inner.model()
    }
}
