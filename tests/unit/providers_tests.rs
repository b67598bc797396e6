/*!
 * Tests for provider kinds, usage accounting, the generic LLM provider and whisper
 */

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use subtrans::errors::ProviderError;
use subtrans::media::{TranscribeOptions, Transcriber, TranscriptionTask};
use subtrans::providers::llm::LlmProvider;
use subtrans::providers::whisper::WhisperProvider;
use subtrans::providers::{ProviderKind, TokenUsage, TranslationProvider, UsageStats};
use subtrans::translation::RetryPolicy;
use crate::common;
use crate::common::mock_providers::{bad_request, completion, service_unavailable, MockBackend, MockProvider};

fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(1))
}

/// Transcriber that records the options it was given
#[derive(Default)]
struct RecordingTranscriber {
    seen: Mutex<Vec<TranscribeOptions>>,
    fail: bool,
}

#[async_trait]
impl Transcriber for RecordingTranscriber {
    async fn transcribe(&self, audio_path: &Path, options: &TranscribeOptions) -> Result<PathBuf> {
        self.seen.lock().push(options.clone());
        if self.fail {
            return Err(anyhow!("whisper exited with status 1"));
        }
        Ok(options.output_dir.join(audio_path.with_extension("srt").file_name().unwrap_or_default()))
    }
}

fn llm(backend: MockBackend) -> LlmProvider<MockBackend> {
    LlmProvider::new(backend, ProviderKind::OpenAI, "system prompt", fast_retry())
}

#[test]
fn test_provider_kind_from_str_withAliases_shouldParse() {
    assert_eq!(ProviderKind::from_str("OpenAI").unwrap(), ProviderKind::OpenAI);
    assert_eq!(ProviderKind::from_str("claude").unwrap(), ProviderKind::Anthropic);
    assert_eq!(ProviderKind::from_str(" google ").unwrap(), ProviderKind::Gemini);
    assert_eq!(ProviderKind::from_str("moonshot").unwrap(), ProviderKind::Kimi);
    assert_eq!(ProviderKind::from_str("whisper").unwrap(), ProviderKind::Whisper);
    assert!(ProviderKind::from_str("ollama").is_err());
}

#[test]
fn test_provider_kind_env_var_withEachKind_shouldMatchConvention() {
    assert_eq!(ProviderKind::OpenAI.env_var(), Some("OPENAI_API_KEY"));
    assert_eq!(ProviderKind::Anthropic.env_var(), Some("ANTHROPIC_API_KEY"));
    assert_eq!(ProviderKind::Gemini.env_var(), Some("GEMINI_API_KEY"));
    assert_eq!(ProviderKind::Kimi.env_var(), Some("KIMI_API_KEY"));
    assert_eq!(ProviderKind::Whisper.env_var(), None);
    assert!(!ProviderKind::Whisper.requires_api_key());
}

#[test]
fn test_provider_kind_serde_withLowercaseNames_shouldRoundTrip() {
    let json = serde_json::to_string(&ProviderKind::Anthropic).unwrap();
    assert_eq!(json, "\"anthropic\"");
    let kind: ProviderKind = serde_json::from_str("\"kimi\"").unwrap();
    assert_eq!(kind, ProviderKind::Kimi);
}

#[test]
fn test_token_usage_total_withoutReportedTotal_shouldSumParts() {
    let usage = TokenUsage {
        input_tokens: 12,
        output_tokens: 30,
        cached_tokens: 2,
        total_tokens: None,
    };
    assert_eq!(usage.total(), 42);
    assert_eq!(TokenUsage { total_tokens: Some(50), ..usage }.total(), 50);
}

#[test]
fn test_usage_stats_accumulate_and_since_withTwoSnapshots_shouldBeInverse() {
    let earlier = UsageStats {
        calls: 2,
        retries: 1,
        total_tokens: 100,
        input_tokens: 70,
        output_tokens: 30,
        cached_tokens: 10,
    };
    let delta = UsageStats {
        calls: 3,
        retries: 0,
        total_tokens: 60,
        input_tokens: 40,
        output_tokens: 20,
        cached_tokens: 5,
    };

    let mut later = earlier;
    later.accumulate(&delta);

    assert_eq!(later.calls, 5);
    assert_eq!(later.since(&earlier), delta);
    assert!(later.summary().contains("API calls: 5 (retries: 1)"));
}

#[tokio::test]
async fn test_llm_provider_withNumberedAnswer_shouldParseAndCountUsage() -> Result<()> {
    let provider = llm(MockBackend::always(|| completion("[1] Bonjour\n[2] Monde")));
    let entries = common::entries_with_texts(&["Hello", "World"]);

    let translations = provider.translate_batch(&entries).await?;

    assert_eq!(translations, vec!["Bonjour", "Monde"]);
    assert_eq!(provider.backend().last_user_prompt().as_deref(), Some("[1] Hello\n[2] World"));
    let stats = provider.stats();
    assert_eq!(stats.calls, 1);
    assert_eq!(stats.input_tokens, 20);
    assert_eq!(stats.output_tokens, 8);
    assert_eq!(stats.cached_tokens, 4);
    assert_eq!(stats.total_tokens, 28);
    assert_eq!(provider.model(), "mock-chat");
    Ok(())
}

#[tokio::test]
async fn test_llm_provider_withTransientFailures_shouldRetryAndCountRetries() -> Result<()> {
    let backend = MockBackend::scripted(
        vec![service_unavailable(), service_unavailable()],
        || completion("[1] ok"),
    );
    let provider = llm(backend);

    let translations = provider.translate_batch(&common::entries_with_texts(&["fine"])).await?;

    assert_eq!(translations, vec!["ok"]);
    assert_eq!(provider.backend().attempts(), 3);
    assert_eq!(provider.stats().retries, 2);
    assert_eq!(provider.stats().calls, 1);
    Ok(())
}

#[tokio::test]
async fn test_llm_provider_withPersistentOverload_shouldGiveUpAfterFourAttempts() {
    let provider = llm(MockBackend::always(service_unavailable));

    let result = provider.translate_batch(&common::entries_with_texts(&["x"])).await;

    assert!(matches!(result, Err(ProviderError::ApiError { status_code: 503, .. })));
    assert_eq!(provider.backend().attempts(), 4);
    assert_eq!(provider.stats().calls, 0);
    assert_eq!(provider.stats().retries, 3);
}

#[tokio::test]
async fn test_llm_provider_withBadRequest_shouldFailWithoutRetry() {
    let provider = llm(MockBackend::always(bad_request));

    let result = provider.translate_batch(&common::entries_with_texts(&["x"])).await;

    assert!(matches!(result, Err(ProviderError::ApiError { status_code: 400, .. })));
    assert_eq!(provider.backend().attempts(), 1);
}

#[tokio::test]
async fn test_llm_provider_withEmptyBatch_shouldNotCallBackend() -> Result<()> {
    let provider = llm(MockBackend::always(|| completion("unused")));

    let translations = provider.translate_batch(&[]).await?;

    assert!(translations.is_empty());
    assert_eq!(provider.backend().attempts(), 0);
    Ok(())
}

#[tokio::test]
async fn test_llm_provider_reset_stats_afterCalls_shouldZeroCounters() -> Result<()> {
    let provider = llm(MockBackend::always(|| completion("[1] a")));
    provider.translate_batch(&common::entries_with_texts(&["a"])).await?;
    assert_eq!(provider.stats().calls, 1);

    provider.reset_stats();

    assert_eq!(provider.stats(), UsageStats::default());
    Ok(())
}

#[test]
fn test_whisper_provider_withNonEnglishTarget_shouldBeRejected() {
    let result = WhisperProvider::new("small", "fr");
    assert!(matches!(result, Err(ProviderError::UnsupportedOperation(_))));
}

#[tokio::test]
async fn test_whisper_provider_withEnglishTarget_shouldRejectTextBatches() -> Result<()> {
    let provider = WhisperProvider::new("small", "eng")?;
    assert_eq!(provider.kind(), ProviderKind::Whisper);
    assert_eq!(provider.model(), "small");
    assert_eq!(provider.target_language(), "eng");

    let result = provider.translate_batch(&common::entries_with_texts(&["Hello"])).await;
    assert!(matches!(result, Err(ProviderError::UnsupportedOperation(_))));
    Ok(())
}

#[tokio::test]
async fn test_whisper_translate_audio_withSourceHint_shouldTranslateAndCountCall() -> Result<()> {
    let provider = WhisperProvider::new("small", "en")?.with_source_language("ja");
    let transcriber = RecordingTranscriber::default();

    let produced = provider
        .translate_audio(&transcriber, Path::new("talk.mp3"), Path::new("/tmp/out"))
        .await?;

    assert_eq!(produced, PathBuf::from("/tmp/out/talk.srt"));
    assert_eq!(provider.stats().calls, 1);
    let seen = transcriber.seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].task, TranscriptionTask::Translate);
    assert_eq!(seen[0].model, "small");
    assert_eq!(seen[0].language.as_deref(), Some("ja"));
    Ok(())
}

#[tokio::test]
async fn test_whisper_translate_audio_withFailingTool_shouldNotCountCall() -> Result<()> {
    let provider = WhisperProvider::new("small", "en")?;
    let transcriber = RecordingTranscriber {
        fail: true,
        ..RecordingTranscriber::default()
    };

    let result = provider
        .translate_audio(&transcriber, Path::new("talk.mp3"), Path::new("/tmp/out"))
        .await;

    match result {
        Err(ProviderError::RequestFailed(message)) => assert!(message.contains("status 1")),
        other => panic!("expected RequestFailed, got {:?}", other),
    }
    assert_eq!(provider.stats().calls, 0);
    Ok(())
}

#[tokio::test]
async fn test_translate_audio_withRemoteProvider_shouldBeUnsupported() {
    let provider = MockProvider::prefixing("x").with_kind(ProviderKind::Gemini);
    let transcriber = RecordingTranscriber::default();

    let result = provider
        .translate_audio(&transcriber, Path::new("talk.mp3"), Path::new("/tmp/out"))
        .await;

    match result {
        Err(ProviderError::UnsupportedOperation(message)) => assert!(message.contains("Gemini")),
        other => panic!("expected UnsupportedOperation, got {:?}", other),
    }
    assert!(transcriber.seen.lock().is_empty());
}
