use anyhow::{anyhow, Context, Result};
use log::{warn, LevelFilter};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use crate::file_utils::FileManager;
use crate::language_utils;
use crate::providers::{ProviderKind, ProviderOptions};
use crate::translation::batch::BatchingConfig;
use crate::translation::core::MergeOptions;
use crate::translation::prompts::PromptTemplate;
use crate::translation::retry::RetryPolicy;

// @module: JSON configuration file (`conf.json`)

/// Settings for a translation run, overridable from the command line
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// ISO 639 code of the input captions
    pub source_language: String,

    /// ISO 639 code to translate into
    pub target_language: String,

    /// Provider, batching and request settings
    #[serde(default)]
    pub translation: TranslationConfig,

    #[serde(default)]
    pub log_level: LogLevel,
}

/// Which provider to call and how to batch captions for it
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct TranslationConfig {
    /// Provider to use; detected from the available keys when absent
    #[serde(default)]
    pub provider: Option<ProviderKind>,

    /// Model name; the provider default when absent
    #[serde(default)]
    pub model: Option<String>,

    /// API key; the environment is consulted when absent
    #[serde(default)]
    pub api_key: Option<String>,

    /// Service URL override
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Batch size limits
    #[serde(default)]
    pub batching: BatchingConfig,

    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Request settings shared by every provider
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TranslationCommonConfig {
    /// System prompt with `{source_language}` and `{target_language}` placeholders
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Delay in milliseconds between consecutive batches
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// Retries after a transient API failure
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Delay before the first retry, doubled on every further retry (in milliseconds)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Sampling temperature, 0.0 to 2.0
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            batch_delay_ms: default_batch_delay_ms(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Verbosity of the stderr logger
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn default_batch_delay_ms() -> u64 {
    500
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_temperature() -> f32 {
    0.3
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_system_prompt() -> String {
    PromptTemplate::SUBTITLE_TRANSLATOR.to_string()
}

impl Config {
    /// Load a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open config file: {}", path.display()))?;

        let reader = BufReader::new(file);
        serde_json::from_reader(reader).with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load a configuration file, writing the defaults there first if it does not exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load(path);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    /// Save the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let config_json = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        FileManager::write_atomically(path.as_ref(), &config_json)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))
    }

    /// Reject unknown languages, identical source and target, and out-of-range limits
    pub fn validate(&self) -> Result<()> {
        language_utils::get_language_name(&self.source_language)
            .with_context(|| format!("Invalid source language: {}", self.source_language))?;
        language_utils::get_language_name(&self.target_language)
            .with_context(|| format!("Invalid target language: {}", self.target_language))?;

        if language_utils::language_codes_match(&self.source_language, &self.target_language) {
            return Err(anyhow!(
                "Source and target language are the same: {}",
                self.target_language
            ));
        }

        if self.translation.provider == Some(ProviderKind::Whisper)
            && !language_utils::language_codes_match(&self.target_language, "en")
        {
            return Err(anyhow!("The whisper provider can only translate into English"));
        }

        let batching = &self.translation.batching;
        if batching.max_entries_per_batch == 0 || batching.max_chars_per_batch == 0 {
            return Err(anyhow!("Batch limits must be greater than zero"));
        }

        let temperature = self.translation.common.temperature;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(anyhow!("Temperature must be between 0.0 and 2.0, got {}", temperature));
        }

        Ok(())
    }

    /// Retry policy derived from the common settings
    pub fn retry_policy(&self) -> RetryPolicy {
        let common = &self.translation.common;
        RetryPolicy::new(common.retry_count, Duration::from_millis(common.retry_backoff_ms))
    }

    /// Options for provider selection and construction
    pub fn provider_options(&self) -> ProviderOptions {
        let translation = &self.translation;
        ProviderOptions {
            provider: translation.provider,
            api_key: translation.api_key.clone(),
            model: translation.model.clone(),
            endpoint: translation.endpoint.clone(),
            source_language: self.source_language.clone(),
            target_language: self.target_language.clone(),
            temperature: translation.common.temperature,
            timeout: Duration::from_secs(translation.common.timeout_secs),
            retry: self.retry_policy(),
            system_prompt: Some(translation.common.system_prompt.clone()),
        }
    }

    /// Options for the merge loop
    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions::new(Duration::from_millis(self.translation.common.batch_delay_ms))
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: "en".to_string(),
            target_language: "fr".to_string(),
            translation: TranslationConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
