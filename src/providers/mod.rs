/*!
 * Provider implementations for different translation services.
 *
 * Every backend implements [`TranslationProvider`], so the translation
 * service can drive any of them interchangeably:
 * - OpenAI, Anthropic, Gemini and Kimi: remote LLM APIs, each wrapped in the
 *   generic [`llm::LlmProvider`] on top of a [`llm::ChatBackend`]
 * - Whisper: local speech model, audio only
 *
 * [`selection`] picks and builds the right backend from options and credentials.
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::errors::ProviderError;
use crate::media::Transcriber;
use crate::subtitle_processor::SubtitleEntry;

pub mod anthropic;
pub mod gemini;
pub mod http;
pub mod kimi;
pub mod llm;
pub mod openai;
pub mod selection;
pub mod whisper;

pub use selection::{create_provider, detect_provider_from_key, select_provider, Credentials, ProviderOptions, ProviderSelection};

/// Common trait for all translation providers
///
/// `translate_batch` must return exactly one string per input entry, in the
/// same order. Statistics are handed out by value.
#[async_trait]
pub trait TranslationProvider: Send + Sync + Debug {
    /// Translate a batch of entries
    async fn translate_batch(&self, batch: &[SubtitleEntry]) -> Result<Vec<String>, ProviderError>;

    /// Snapshot of the usage statistics
    fn stats(&self) -> UsageStats;

    /// Reset usage statistics to zero
    fn reset_stats(&self);

    /// Which backend this is
    fn kind(&self) -> ProviderKind;

    /// Model used for requests
    fn model(&self) -> &str;

    /// Turn an audio or video file straight into target-language subtitles
    /// written under `output_dir`. Only local speech models support this.
    async fn translate_audio(
        &self,
        _transcriber: &dyn Transcriber,
        _audio_path: &Path,
        _output_dir: &Path,
    ) -> Result<PathBuf, ProviderError> {
        Err(ProviderError::UnsupportedOperation(format!(
            "{} cannot translate audio",
            self.kind().display_name()
        )))
    }
}

/// Available provider backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAI,
    Anthropic,
    Gemini,
    Kimi,
    Whisper,
}

impl ProviderKind {
    /// Remote providers in the order their environment variables are scanned
    pub const REMOTE: [ProviderKind; 4] = [Self::OpenAI, Self::Anthropic, Self::Gemini, Self::Kimi];

    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::Gemini => "Gemini",
            Self::Kimi => "Kimi",
            Self::Whisper => "Whisper",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
            Self::Kimi => "kimi",
            Self::Whisper => "whisper",
        }
    }

    /// Environment variable holding the API key, if the provider needs one
    pub fn env_var(&self) -> Option<&'static str> {
        match self {
            Self::OpenAI => Some("OPENAI_API_KEY"),
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
            Self::Gemini => Some("GEMINI_API_KEY"),
            Self::Kimi => Some("KIMI_API_KEY"),
            Self::Whisper => None,
        }
    }

    pub fn requires_api_key(&self) -> bool {
        self.env_var().is_some()
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAI => "gpt-4o-mini",
            Self::Anthropic => "claude-3-5-haiku-latest",
            Self::Gemini => "gemini-2.0-flash",
            Self::Kimi => "kimi-k2-0711-preview",
            Self::Whisper => "small",
        }
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::OpenAI => "https://api.openai.com/v1",
            Self::Anthropic => "https://api.anthropic.com",
            Self::Gemini => "https://generativelanguage.googleapis.com",
            Self::Kimi => "https://api.moonshot.ai/v1",
            Self::Whisper => "",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "gemini" | "google" => Ok(Self::Gemini),
            "kimi" | "moonshot" => Ok(Self::Kimi),
            "whisper" | "local" => Ok(Self::Whisper),
            _ => Err(anyhow::anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Token counts reported by a single response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Input tokens served from the provider's prompt cache
    pub cached_tokens: u64,
    /// Total as reported; falls back to input + output when absent
    pub total_tokens: Option<u64>,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.total_tokens.unwrap_or(self.input_tokens + self.output_tokens)
    }
}

/// Accumulated call, retry and token counts for one provider instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UsageStats {
    /// Successful API calls
    pub calls: u64,
    /// Retries performed after transient failures
    pub retries: u64,
    pub total_tokens: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cached_tokens: u64,
}

impl UsageStats {
    /// Add the token counts of one response
    pub fn record_usage(&mut self, usage: &TokenUsage) {
        self.input_tokens += usage.input_tokens;
        self.output_tokens += usage.output_tokens;
        self.cached_tokens += usage.cached_tokens;
        self.total_tokens += usage.total();
    }

    /// Merge another snapshot into this one
    pub fn accumulate(&mut self, other: &UsageStats) {
        self.calls += other.calls;
        self.retries += other.retries;
        self.total_tokens += other.total_tokens;
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.cached_tokens += other.cached_tokens;
    }

    /// Difference between this snapshot and an earlier one of the same provider
    pub fn since(&self, earlier: &UsageStats) -> UsageStats {
        UsageStats {
            calls: self.calls.saturating_sub(earlier.calls),
            retries: self.retries.saturating_sub(earlier.retries),
            total_tokens: self.total_tokens.saturating_sub(earlier.total_tokens),
            input_tokens: self.input_tokens.saturating_sub(earlier.input_tokens),
            output_tokens: self.output_tokens.saturating_sub(earlier.output_tokens),
            cached_tokens: self.cached_tokens.saturating_sub(earlier.cached_tokens),
        }
    }

    /// Generate a summary of usage
    pub fn summary(&self) -> String {
        format!(
            "API calls: {} (retries: {})\n\
             Input tokens: {} (cached: {})\n\
             Output tokens: {}\n\
             Total tokens: {}",
            self.calls,
            self.retries,
            self.input_tokens,
            self.cached_tokens,
            self.output_tokens,
            self.total_tokens
        )
    }
}
