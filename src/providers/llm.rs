/*!
 * Generic batch translator on top of any chat-style LLM backend.
 */

use async_trait::async_trait;
use log::debug;
use parking_lot::Mutex;
use std::fmt::Debug;

use crate::errors::ProviderError;
use crate::subtitle_processor::SubtitleEntry;
use crate::translation::prompts::{build_batch_prompt, parse_batch_response};
use crate::translation::retry::{with_retry, RetryPolicy};
use super::{ProviderKind, TokenUsage, TranslationProvider, UsageStats};

/// Text and optional token usage of one completed request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

/// A single system + user prompt round trip against a remote model
#[async_trait]
pub trait ChatBackend: Send + Sync + Debug {
    /// Send one request and return the model's text
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<Completion, ProviderError>;

    /// Model name used by this backend
    fn model(&self) -> &str;
}

/// Translates numbered batches through a [`ChatBackend`], with retry and usage accounting
#[derive(Debug)]
pub struct LlmProvider<B: ChatBackend> {
    backend: B,
    kind: ProviderKind,
    system_prompt: String,
    retry: RetryPolicy,
    stats: Mutex<UsageStats>,
}

impl<B: ChatBackend> LlmProvider<B> {
    pub fn new(backend: B, kind: ProviderKind, system_prompt: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            backend,
            kind,
            system_prompt: system_prompt.into(),
            retry,
            stats: Mutex::new(UsageStats::default()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }
}

#[async_trait]
impl<B: ChatBackend> TranslationProvider for LlmProvider<B> {
    async fn translate_batch(&self, batch: &[SubtitleEntry]) -> Result<Vec<String>, ProviderError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let user_prompt = build_batch_prompt(batch);
        let backend = &self.backend;
        let system_prompt = self.system_prompt.as_str();
        let prompt = user_prompt.as_str();

        let completion = with_retry(
            &self.retry,
            move || backend.complete(system_prompt, prompt),
            |_, _| self.stats.lock().retries += 1,
        )
        .await?;

        {
            let mut stats = self.stats.lock();
            stats.calls += 1;
            if let Some(usage) = &completion.usage {
                stats.record_usage(usage);
            }
        }

        debug!("{} answered a batch of {} entries", self.kind.display_name(), batch.len());
        Ok(parse_batch_response(&completion.text, batch))
    }

    fn stats(&self) -> UsageStats {
        *self.stats.lock()
    }

    fn reset_stats(&self) {
        *self.stats.lock() = UsageStats::default();
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn model(&self) -> &str {
        self.backend.model()
    }
}
