use async_trait::async_trait;
use log::info;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

use crate::errors::ProviderError;
use crate::language_utils;
use crate::media::{TranscribeOptions, Transcriber, TranscriptionTask};
use crate::subtitle_processor::{SubtitleEntry, SubtitleFormat};
use super::{ProviderKind, TranslationProvider, UsageStats};

/// Local whisper model. It works on audio only and can only produce English,
/// so caption batches are rejected outright.
#[derive(Debug)]
pub struct WhisperProvider {
    model: String,
    source_language: Option<String>,
    target_language: String,
    stats: Mutex<UsageStats>,
}

impl WhisperProvider {
    /// Create a provider for `target_language`, which must be English
    pub fn new(model: impl Into<String>, target_language: &str) -> Result<Self, ProviderError> {
        if !language_utils::language_codes_match(target_language, "en") {
            return Err(ProviderError::UnsupportedOperation(format!(
                "Whisper can only translate into English, not '{}'",
                target_language
            )));
        }

        Ok(Self {
            model: model.into(),
            source_language: None,
            target_language: target_language.to_string(),
            stats: Mutex::new(UsageStats::default()),
        })
    }

    /// Spoken language hint; the model detects it when unset
    pub fn with_source_language(mut self, language: impl Into<String>) -> Self {
        self.source_language = Some(language.into());
        self
    }

    pub fn target_language(&self) -> &str {
        &self.target_language
    }
}

#[async_trait]
impl TranslationProvider for WhisperProvider {
    async fn translate_batch(&self, _batch: &[SubtitleEntry]) -> Result<Vec<String>, ProviderError> {
        Err(ProviderError::UnsupportedOperation(
            "Whisper translates audio, not subtitle text".to_string(),
        ))
    }

    fn stats(&self) -> UsageStats {
        *self.stats.lock()
    }

    fn reset_stats(&self) {
        *self.stats.lock() = UsageStats::default();
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Whisper
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn translate_audio(
        &self,
        transcriber: &dyn Transcriber,
        audio_path: &Path,
        output_dir: &Path,
    ) -> Result<PathBuf, ProviderError> {
        let options = TranscribeOptions {
            model: self.model.clone(),
            language: self.source_language.clone(),
            task: TranscriptionTask::Translate,
            output_format: SubtitleFormat::SubRip,
            output_dir: output_dir.to_path_buf(),
        };

        info!("Translating audio {:?} with whisper model {}", audio_path, self.model);
        let produced = transcriber
            .transcribe(audio_path, &options)
            .await
            .map_err(|e| ProviderError::RequestFailed(format!("{:#}", e)))?;
        self.stats.lock().calls += 1;

        Ok(produced)
    }
}
