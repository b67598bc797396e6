use anyhow::{anyhow, Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::file_utils::{FileManager, FileType};
use crate::media::{FfmpegExtractor, SubtitleExtractor, Transcriber, WhisperCli};
use crate::providers::{create_provider, Credentials, ProviderKind, TranslationProvider, UsageStats};
use crate::subtitle_processor::{SubtitleCollection, SubtitleFormat};
use crate::translation::core::TranslationService;

// @module: Application controller for subtitle processing

/// Per-run options coming from the command line
#[derive(Debug, Clone, Default)]
pub struct JobOptions {
    /// Directory for output files; next to each input when absent
    pub output_dir: Option<PathBuf>,
    /// Output format; the input's format (or SubRip for media) when absent
    pub output_format: Option<SubtitleFormat>,
    /// Subtitle stream to extract from video containers
    pub stream_index: usize,
    /// Replace existing output files
    pub force_overwrite: bool,
}

/// What happened to a single input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Output written to this path
    Translated(PathBuf),
    /// Output already existed at this path
    Skipped(PathBuf),
}

/// Counts for a whole run
#[derive(Debug, Clone, Default)]
pub struct JobSummary {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Provider usage across all jobs
    pub stats: UsageStats,
    pub elapsed: Duration,
}

impl JobSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.skipped + self.failed
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Main application controller for subtitle translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    service: TranslationService,
    extractor: Box<dyn SubtitleExtractor>,
    transcriber: Box<dyn Transcriber>,
    multi_progress: MultiProgress,
}

impl Controller {
    /// Create a controller using ffmpeg and whisper for media inputs
    pub fn new(config: Config, provider: Box<dyn TranslationProvider>) -> Self {
        Self::with_collaborators(
            config,
            provider,
            Box::new(FfmpegExtractor::default()),
            Box::new(WhisperCli::default()),
        )
    }

    /// Create a controller with explicit media collaborators
    pub fn with_collaborators(
        config: Config,
        provider: Box<dyn TranslationProvider>,
        extractor: Box<dyn SubtitleExtractor>,
        transcriber: Box<dyn Transcriber>,
    ) -> Self {
        let service = TranslationService::new(provider, config.translation.batching, config.merge_options());
        Self {
            config,
            service,
            extractor,
            transcriber,
            multi_progress: MultiProgress::new(),
        }
    }

    // @method: Select and build the provider from config and resolved credentials
    pub fn from_config(config: Config, credentials: &Credentials) -> Result<Self> {
        let provider = create_provider(&config.provider_options(), credentials)?;
        Ok(Self::new(config, provider))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn provider(&self) -> &dyn TranslationProvider {
        self.service.provider()
    }

    /// Run every input, expanding directories. A failing input is logged and
    /// counted; the remaining inputs still run.
    pub async fn run(&self, inputs: &[PathBuf], options: &JobOptions) -> Result<JobSummary> {
        let start_time = Instant::now();
        let files = Self::collect_inputs(inputs)?;
        if files.is_empty() {
            return Err(anyhow!("No subtitle, video or audio files found in the given inputs"));
        }

        info!(
            "Translating {} file(s) to {} with {} ({})",
            files.len(),
            self.config.target_language,
            self.provider().kind().display_name(),
            self.provider().model()
        );

        let files_pb = self.multi_progress.add(ProgressBar::new(files.len() as u64));
        files_pb.set_style(Self::progress_style("files"));
        files_pb.set_message("Processing files");

        let mut summary = JobSummary::default();

        for file in &files {
            let file_name = file
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            files_pb.set_message(format!("Processing: {}", file_name));

            let stats_before = self.provider().stats();
            match self.run_job(file, options).await {
                Ok(JobOutcome::Translated(path)) => {
                    info!("Success: {}", path.display());
                    summary.succeeded += 1;
                }
                Ok(JobOutcome::Skipped(path)) => {
                    warn!(
                        "Skipping {}, {} already exists (use --force-overwrite to replace it)",
                        file_name,
                        path.display()
                    );
                    summary.skipped += 1;
                }
                Err(e) => {
                    error!("Error processing file {}: {:#}", file_name, e);
                    summary.failed += 1;
                }
            }
            summary.stats.accumulate(&self.provider().stats().since(&stats_before));

            files_pb.inc(1);
        }

        files_pb.finish_and_clear();
        summary.elapsed = start_time.elapsed();

        info!(
            "Processing completed in {}: {} translated, {} skipped, {} failed",
            Self::format_duration(summary.elapsed),
            summary.succeeded,
            summary.skipped,
            summary.failed
        );
        if summary.stats.calls > 0 {
            info!("{}", summary.stats.summary());
        }

        Ok(summary)
    }

    /// Translate one input file into its output file
    pub async fn run_job(&self, input_file: &Path, options: &JobOptions) -> Result<JobOutcome> {
        if !input_file.exists() {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }

        let file_type = FileManager::detect_file_type(input_file);
        let output_format = match (options.output_format, file_type) {
            (Some(format), _) => format,
            (None, FileType::Subtitle(format)) => format,
            (None, _) => SubtitleFormat::SubRip,
        };

        let output_dir = match &options.output_dir {
            Some(dir) => dir.clone(),
            None => input_file
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        };
        let output_path = FileManager::generate_output_path(
            input_file,
            &output_dir,
            &self.config.target_language,
            output_format.extension(),
        );

        if output_path.exists() && !options.force_overwrite {
            return Ok(JobOutcome::Skipped(output_path));
        }

        let translated = match file_type {
            FileType::Subtitle(_) => {
                let subtitles = SubtitleCollection::from_file(input_file)
                    .with_context(|| format!("Failed to parse subtitle file {:?}", input_file))?;
                self.translate_collection(subtitles).await?
            }
            FileType::Video if self.provider().kind() != ProviderKind::Whisper => {
                let subtitles = self.extract_subtitles(input_file, options.stream_index).await?;
                self.translate_collection(subtitles).await?
            }
            FileType::Video | FileType::Audio => self.transcribe_media(input_file).await?,
            FileType::Unknown => {
                return Err(anyhow!("Unsupported input file type: {:?}", input_file));
            }
        };

        FileManager::write_atomically(&output_path, &translated.to_format_string(output_format))?;
        Ok(JobOutcome::Translated(output_path))
    }

    /// Translate a parsed collection, driving a per-file progress bar
    async fn translate_collection(&self, subtitles: SubtitleCollection) -> Result<SubtitleCollection> {
        debug!(
            "Translating {} captions ({} chars) from {:?}",
            subtitles.entries.len(),
            subtitles.total_chars(),
            subtitles.source_file
        );

        let progress_bar = self.multi_progress.add(ProgressBar::new(0));
        progress_bar.set_style(Self::progress_style("batches"));
        progress_bar.set_message("Translating");

        let pb = progress_bar.clone();
        let result = self
            .service
            .translate_collection_with_progress(&subtitles, move |completed, total| {
                pb.set_length(total as u64);
                pb.set_position(completed as u64);
            })
            .await;

        progress_bar.finish_and_clear();
        let outcome = result?;

        let mut translated = SubtitleCollection::new(subtitles.source_file, subtitles.format);
        translated.entries = outcome.entries;
        Ok(translated)
    }

    /// Pull a subtitle stream out of a video container and parse it
    async fn extract_subtitles(&self, input_file: &Path, stream_index: usize) -> Result<SubtitleCollection> {
        info!("Extracting subtitle stream {} from {:?}", stream_index, input_file);
        let extracted = self.extractor.extract_subtitle_stream(input_file, stream_index).await?;

        let result = SubtitleCollection::from_file(&extracted)
            .with_context(|| format!("Failed to parse subtitles extracted from {:?}", input_file));
        if let Err(e) = std::fs::remove_file(&extracted) {
            debug!("Could not remove extracted file {:?}: {}", extracted, e);
        }

        let mut subtitles = result?;
        subtitles.source_file = input_file.to_path_buf();
        Ok(subtitles)
    }

    /// Let the local speech model produce English subtitles directly
    async fn transcribe_media(&self, input_file: &Path) -> Result<SubtitleCollection> {
        if self.provider().kind() != ProviderKind::Whisper {
            return Err(anyhow!(
                "Audio input needs the whisper provider, but {} is selected",
                self.provider().kind().display_name()
            ));
        }

        let work_dir = tempfile::tempdir().context("Failed to create a working directory")?;
        let produced = self
            .provider()
            .translate_audio(self.transcriber.as_ref(), input_file, work_dir.path())
            .await?;

        let mut subtitles = SubtitleCollection::from_file(&produced)
            .with_context(|| format!("Failed to parse whisper output for {:?}", input_file))?;
        subtitles.source_file = input_file.to_path_buf();
        Ok(subtitles)
    }

    /// Expand directories into the supported files they contain
    fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for input in inputs {
            if input.is_dir() {
                files.extend(FileManager::find_input_files(input)?);
            } else {
                files.push(input.clone());
            }
        }
        Ok(files)
    }

    fn progress_style(unit: &str) -> ProgressStyle {
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{msg}}",
                unit
            ))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░")
    }

    // Format duration in a human-readable format
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
