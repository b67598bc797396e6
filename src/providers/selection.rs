/*!
 * Provider selection and construction.
 *
 * Credentials are resolved once, at the program boundary, into a
 * [`Credentials`] value. Everything below works on that value and never reads
 * the process environment, so the selection rules can be tested directly.
 */

use log::{debug, info};
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::ProviderError;
use crate::language_utils;
use crate::translation::prompts::PromptTemplate;
use crate::translation::retry::RetryPolicy;
use super::anthropic::Anthropic;
use super::gemini::Gemini;
use super::kimi::Kimi;
use super::llm::LlmProvider;
use super::openai::OpenAI;
use super::whisper::WhisperProvider;
use super::{ProviderKind, TranslationProvider};

/// API keys known for each remote provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    keys: HashMap<ProviderKind, String>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every provider's key variable from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build credentials from an arbitrary variable lookup. Blank values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut credentials = Self::new();
        for kind in ProviderKind::REMOTE {
            if let Some(var) = kind.env_var() {
                if let Some(key) = lookup(var) {
                    credentials = credentials.with_key(kind, key);
                }
            }
        }
        credentials
    }

    /// Add or replace a key
    pub fn with_key(mut self, kind: ProviderKind, key: impl Into<String>) -> Self {
        let key = key.into();
        let key = key.trim();
        if !key.is_empty() {
            self.keys.insert(kind, key.to_string());
        }
        self
    }

    pub fn get(&self, kind: ProviderKind) -> Option<&str> {
        self.keys.get(&kind).map(String::as_str)
    }

    /// First remote provider with a key, scanning in environment variable order
    pub fn first_available(&self) -> Option<(ProviderKind, &str)> {
        ProviderKind::REMOTE
            .iter()
            .find_map(|kind| self.get(*kind).map(|key| (*kind, key)))
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Everything needed to pick and build a provider
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    /// Explicit provider; detected when absent
    pub provider: Option<ProviderKind>,
    /// Explicit API key, takes precedence over credentials
    pub api_key: Option<String>,
    /// Model override; the provider default otherwise
    pub model: Option<String>,
    /// Endpoint override; the provider default otherwise
    pub endpoint: Option<String>,
    pub source_language: String,
    pub target_language: String,
    pub temperature: f32,
    /// HTTP request timeout
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// System prompt template with `{source_language}` and `{target_language}` placeholders
    pub system_prompt: Option<String>,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            provider: None,
            api_key: None,
            model: None,
            endpoint: None,
            source_language: "en".to_string(),
            target_language: "fr".to_string(),
            temperature: 0.3,
            timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            system_prompt: None,
        }
    }
}

impl ProviderOptions {
    fn explicit_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

/// The chosen provider and the key it will use
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSelection {
    pub kind: ProviderKind,
    pub api_key: Option<String>,
}

/// Guess the provider from the shape of an API key. Bare `sk-` keys and
/// anything unrecognized resolve to OpenAI.
pub fn detect_provider_from_key(key: &str) -> ProviderKind {
    let key = key.trim();
    if key.starts_with("sk-kimi-") {
        ProviderKind::Kimi
    } else if key.starts_with("sk-ant-") {
        ProviderKind::Anthropic
    } else if key.starts_with("sk-") {
        ProviderKind::OpenAI
    } else if key.starts_with("AIza") {
        ProviderKind::Gemini
    } else {
        ProviderKind::OpenAI
    }
}

/// Decide which provider to use.
///
/// An explicit provider wins, then the prefix of an explicit key, then the
/// first provider with a credential, then the local whisper model.
pub fn select_provider(
    options: &ProviderOptions,
    credentials: &Credentials,
) -> Result<ProviderSelection, ProviderError> {
    if let Some(kind) = options.provider {
        if !kind.requires_api_key() {
            return Ok(ProviderSelection { kind, api_key: None });
        }

        let key = options
            .explicit_key()
            .or_else(|| credentials.get(kind))
            .ok_or_else(|| ProviderError::MissingApiKey {
                provider: kind.display_name().to_string(),
                env_var: kind.env_var().unwrap_or_default().to_string(),
            })?;

        return Ok(ProviderSelection {
            kind,
            api_key: Some(key.to_string()),
        });
    }

    if let Some(key) = options.explicit_key() {
        let kind = detect_provider_from_key(key);
        debug!("Detected {} from the API key prefix", kind.display_name());
        return Ok(ProviderSelection {
            kind,
            api_key: Some(key.to_string()),
        });
    }

    if let Some((kind, key)) = credentials.first_available() {
        debug!("Using {} from {}", kind.display_name(), kind.env_var().unwrap_or_default());
        return Ok(ProviderSelection {
            kind,
            api_key: Some(key.to_string()),
        });
    }

    debug!("No API key available, falling back to local whisper");
    Ok(ProviderSelection {
        kind: ProviderKind::Whisper,
        api_key: None,
    })
}

/// Human-readable language name for prompts, falling back to the raw code
fn language_name(code: &str) -> String {
    language_utils::get_language_name(code).unwrap_or_else(|_| code.to_string())
}

/// Select and build a provider
pub fn create_provider(
    options: &ProviderOptions,
    credentials: &Credentials,
) -> Result<Box<dyn TranslationProvider>, ProviderError> {
    let ProviderSelection { kind, api_key } = select_provider(options, credentials)?;

    let model = options
        .model
        .clone()
        .unwrap_or_else(|| kind.default_model().to_string());

    let api_key = api_key.unwrap_or_default();
    let endpoint = options
        .endpoint
        .clone()
        .unwrap_or_else(|| kind.default_endpoint().to_string());

    let template = options
        .system_prompt
        .as_deref()
        .map(PromptTemplate::new)
        .unwrap_or_default();
    let system_prompt = template.render(
        &language_name(&options.source_language),
        &language_name(&options.target_language),
    );

    info!("Using {} with model {}", kind.display_name(), model);

    let temperature = options.temperature;
    let timeout = options.timeout;
    let retry = options.retry;

    let provider: Box<dyn TranslationProvider> = match kind {
        ProviderKind::OpenAI => Box::new(LlmProvider::new(
            OpenAI::new(api_key, endpoint, model, temperature, timeout),
            kind,
            system_prompt,
            retry,
        )),
        ProviderKind::Anthropic => Box::new(LlmProvider::new(
            Anthropic::new(api_key, endpoint, model, temperature, timeout),
            kind,
            system_prompt,
            retry,
        )),
        ProviderKind::Gemini => Box::new(LlmProvider::new(
            Gemini::new(api_key, endpoint, model, temperature, timeout),
            kind,
            system_prompt,
            retry,
        )),
        ProviderKind::Kimi => Box::new(LlmProvider::new(
            Kimi::new(api_key, endpoint, model, temperature, timeout),
            kind,
            system_prompt,
            retry,
        )),
        ProviderKind::Whisper => Box::new(
            WhisperProvider::new(model, &options.target_language)?
                .with_source_language(options.source_language.as_str()),
        ),
    };

    Ok(provider)
}
