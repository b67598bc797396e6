/*!
 * End-to-end subtitle processing tests
 */

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use subtrans::app_config::Config;
use subtrans::app_controller::{Controller, JobOptions, JobOutcome};
use subtrans::media::{SubtitleExtractor, TranscribeOptions, Transcriber, TranscriptionTask};
use subtrans::providers::whisper::WhisperProvider;
use subtrans::providers::TranslationProvider;
use subtrans::subtitle_processor::{SubtitleCollection, SubtitleFormat};
use crate::common;
use crate::common::mock_providers::MockProvider;

/// Extractor that writes a fixed SubRip document next to the video
struct FixtureExtractor {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl SubtitleExtractor for FixtureExtractor {
    async fn extract_subtitle_stream(&self, video_path: &Path, stream_index: usize) -> Result<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let dir = video_path.parent().ok_or_else(|| anyhow!("no parent"))?;
        common::create_test_file(dir, &format!("extracted_{}.srt", stream_index), common::SAMPLE_SRT)
    }
}

/// Transcriber that writes a fixed English SubRip document
struct FixtureTranscriber {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Transcriber for FixtureTranscriber {
    async fn transcribe(&self, audio_path: &Path, options: &TranscribeOptions) -> Result<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(options.task, TranscriptionTask::Translate);
        assert_eq!(options.model, "small");
        let stem = audio_path.file_stem().unwrap_or_default().to_string_lossy().to_string();
        common::create_test_file(
            &options.output_dir,
            &format!("{}.srt", stem),
            "1\n00:00:00,500 --> 00:00:02,000\nGood evening\n",
        )
    }
}

struct Harness {
    controller: Controller,
    extractions: Arc<AtomicUsize>,
    transcriptions: Arc<AtomicUsize>,
}

fn test_config(source: &str, target: &str) -> Config {
    let mut config = Config::default();
    config.source_language = source.to_string();
    config.target_language = target.to_string();
    config.translation.common.batch_delay_ms = 0;
    config.translation.batching.max_entries_per_batch = 2;
    config
}

fn harness(config: Config, provider: impl TranslationProvider + 'static) -> Harness {
    common::init_test_logging();
    let extractions = Arc::new(AtomicUsize::new(0));
    let transcriptions = Arc::new(AtomicUsize::new(0));
    let controller = Controller::with_collaborators(
        config,
        Box::new(provider),
        Box::new(FixtureExtractor {
            calls: Arc::clone(&extractions),
        }),
        Box::new(FixtureTranscriber {
            calls: Arc::clone(&transcriptions),
        }),
    );
    Harness {
        controller,
        extractions,
        transcriptions,
    }
}

#[tokio::test]
async fn test_run_job_withSrtInput_shouldWriteTranslatedSibling() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "episode.srt")?;
    let h = harness(test_config("en", "fr"), MockProvider::prefixing("[fr] "));

    let outcome = h.controller.run_job(&input, &JobOptions::default()).await?;

    let expected = temp_dir.path().join("episode.fr.srt");
    assert_eq!(outcome, JobOutcome::Translated(expected.clone()));

    let source = SubtitleCollection::from_file(&input)?;
    let translated = SubtitleCollection::from_file(&expected)?;
    assert_eq!(translated.entries.len(), source.entries.len());
    for (t, s) in translated.entries.iter().zip(&source.entries) {
        assert_eq!(t.start_time_ms, s.start_time_ms);
        assert_eq!(t.end_time_ms, s.end_time_ms);
        assert_eq!(t.text, format!("[fr] {}", s.text));
    }
    assert_eq!(h.controller.provider().stats().calls, 2);
    Ok(())
}

#[tokio::test]
async fn test_run_job_withExistingOutput_shouldSkipUnlessForced() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let existing = common::create_test_file(temp_dir.path(), "movie.fr.srt", "keep me")?;
    let h = harness(test_config("en", "fr"), MockProvider::prefixing("[fr] "));

    let outcome = h.controller.run_job(&input, &JobOptions::default()).await?;
    assert_eq!(outcome, JobOutcome::Skipped(existing.clone()));
    assert_eq!(std::fs::read_to_string(&existing)?, "keep me");

    let forced = JobOptions {
        force_overwrite: true,
        ..JobOptions::default()
    };
    let outcome = h.controller.run_job(&input, &forced).await?;
    assert_eq!(outcome, JobOutcome::Translated(existing.clone()));
    assert_ne!(std::fs::read_to_string(&existing)?, "keep me");
    Ok(())
}

#[tokio::test]
async fn test_run_job_withOutputFormatAndDir_shouldConvert() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "show.ass", common::SAMPLE_ASS)?;
    let out_dir = temp_dir.path().join("out");
    let h = harness(test_config("en", "de"), MockProvider::prefixing("[de] "));

    let options = JobOptions {
        output_dir: Some(out_dir.clone()),
        output_format: Some(SubtitleFormat::WebVtt),
        ..JobOptions::default()
    };
    h.controller.run_job(&input, &options).await?;

    let output = out_dir.join("show.de.vtt");
    let content = std::fs::read_to_string(&output)?;
    assert!(content.starts_with("WEBVTT"));

    let translated = SubtitleCollection::from_file(&output)?;
    assert_eq!(translated.format, SubtitleFormat::WebVtt);
    assert_eq!(translated.entries[0].text, "[de] Hello, world");
    assert_eq!(translated.entries[1].text, "[de] First\nSecond");
    Ok(())
}

#[tokio::test]
async fn test_run_job_withFailingBatch_shouldNotWriteOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "clip.srt")?;
    let h = harness(
        test_config("en", "fr"),
        MockProvider::prefixing("[fr] ").failing_on_call(2, 400),
    );

    let result = h.controller.run_job(&input, &JobOptions::default()).await;

    assert!(result.is_err());
    assert!(!temp_dir.path().join("clip.fr.srt").exists());
    Ok(())
}

#[tokio::test]
async fn test_run_withDirectory_shouldIsolateFailures() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_subtitle(temp_dir.path(), "a_good.srt")?;
    common::create_test_file(temp_dir.path(), "b_broken.srt", "this is not a subtitle file")?;
    common::create_test_file(temp_dir.path(), "nested/c_good.vtt", common::SAMPLE_VTT)?;
    common::create_test_file(temp_dir.path(), "notes.txt", "ignored")?;
    let h = harness(test_config("en", "fr"), MockProvider::prefixing("[fr] "));

    let summary = h
        .controller
        .run(&[temp_dir.path().to_path_buf()], &JobOptions::default())
        .await?;

    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.total(), 3);
    assert!(summary.has_failures());
    assert_eq!(summary.stats.calls, 3);
    assert!(temp_dir.path().join("a_good.fr.srt").exists());
    assert!(temp_dir.path().join("nested").join("c_good.fr.vtt").exists());
    assert!(!temp_dir.path().join("b_broken.fr.srt").exists());
    Ok(())
}

#[tokio::test]
async fn test_run_withNoSupportedFiles_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), "readme.md", "nothing here")?;
    let h = harness(test_config("en", "fr"), MockProvider::prefixing("x"));

    let result = h.controller.run(&[temp_dir.path().to_path_buf()], &JobOptions::default()).await;

    assert!(result.is_err());
    Ok(())
}

#[tokio::test]
async fn test_run_job_withVideoAndRemoteProvider_shouldExtractThenTranslate() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let video = common::create_test_file(temp_dir.path(), "film.mkv", "")?;
    let h = harness(test_config("en", "es"), MockProvider::prefixing("[es] "));

    let options = JobOptions {
        stream_index: 3,
        ..JobOptions::default()
    };
    let outcome = h.controller.run_job(&video, &options).await?;

    let expected = temp_dir.path().join("film.es.srt");
    assert_eq!(outcome, JobOutcome::Translated(expected.clone()));
    assert_eq!(h.extractions.load(Ordering::SeqCst), 1);
    assert_eq!(h.transcriptions.load(Ordering::SeqCst), 0);
    // The intermediate extraction is cleaned up
    assert!(!temp_dir.path().join("extracted_3.srt").exists());

    let translated = SubtitleCollection::from_file(&expected)?;
    assert_eq!(translated.entries[0].text, "[es] This is a test subtitle.");
    Ok(())
}

#[tokio::test]
async fn test_run_job_withAudioAndWhisper_shouldTranscribeWithoutBatches() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let audio = common::create_test_file(temp_dir.path(), "interview.mp3", "")?;
    let provider = WhisperProvider::new("small", "en")?.with_source_language("fr");
    let h = harness(test_config("fr", "en"), provider);

    let outcome = h.controller.run_job(&audio, &JobOptions::default()).await?;

    let expected = temp_dir.path().join("interview.en.srt");
    assert_eq!(outcome, JobOutcome::Translated(expected.clone()));
    assert_eq!(h.transcriptions.load(Ordering::SeqCst), 1);
    assert_eq!(h.controller.provider().stats().calls, 1);

    let translated = SubtitleCollection::from_file(&expected)?;
    assert_eq!(translated.entries.len(), 1);
    assert_eq!(translated.entries[0].text, "Good evening");
    assert_eq!(translated.entries[0].start_time_ms, 500);
    Ok(())
}

#[tokio::test]
async fn test_run_withAudioAndWhisper_shouldCountTranscriptionsInSummary() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), "part1.mp3", "")?;
    common::create_test_file(temp_dir.path(), "part2.wav", "")?;
    let provider = WhisperProvider::new("small", "en")?;
    let h = harness(test_config("de", "en"), provider);

    let summary = h
        .controller
        .run(&[temp_dir.path().to_path_buf()], &JobOptions::default())
        .await?;

    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.stats.calls, 2);
    assert_eq!(h.transcriptions.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn test_run_job_withAudioAndRemoteProvider_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let audio = common::create_test_file(temp_dir.path(), "podcast.wav", "")?;
    let h = harness(test_config("en", "fr"), MockProvider::prefixing("x"));

    let result = h.controller.run_job(&audio, &JobOptions::default()).await;

    assert!(result.is_err());
    assert_eq!(h.transcriptions.load(Ordering::SeqCst), 0);
    Ok(())
}
