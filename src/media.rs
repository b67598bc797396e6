/*!
 * External media tools: subtitle stream extraction (ffmpeg) and local speech
 * transcription (whisper). Both are thin process wrappers that hand back the
 * path of the subtitle file they produced.
 */

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{debug, error};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

use crate::subtitle_processor::SubtitleFormat;

/// Extracts one subtitle stream from a container file
#[async_trait]
pub trait SubtitleExtractor: Send + Sync {
    /// Extract stream `stream_index` of `video_path` and return the subtitle file path
    async fn extract_subtitle_stream(&self, video_path: &Path, stream_index: usize) -> Result<PathBuf>;
}

/// What the speech model should produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptionTask {
    /// Subtitles in the spoken language
    Transcribe,
    /// Subtitles translated to English
    Translate,
}

impl TranscriptionTask {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Transcribe => "transcribe",
            Self::Translate => "translate",
        }
    }
}

/// Options for a transcription run
#[derive(Debug, Clone)]
pub struct TranscribeOptions {
    /// Model size or name, e.g. "small"
    pub model: String,
    /// Spoken language; detected by the model when absent
    pub language: Option<String>,
    pub task: TranscriptionTask,
    pub output_format: SubtitleFormat,
    /// Directory receiving the subtitle file
    pub output_dir: PathBuf,
}

/// Turns an audio or video file into a subtitle file
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_path: &Path, options: &TranscribeOptions) -> Result<PathBuf>;
}

/// Run a command with a timeout, returning stdout on success. The child is
/// killed when the timeout fires.
async fn run_tool(mut command: Command, tool: &str, timeout: Duration) -> Result<Vec<u8>> {
    debug!("Running {:?}", command);
    command.kill_on_drop(true);

    let output = tokio::select! {
        result = command.output() => {
            result.map_err(|e| anyhow!("Failed to execute {}: {}", tool, e))?
        },
        _ = tokio::time::sleep(timeout) => {
            return Err(anyhow!("{} timed out after {:?}", tool, timeout));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let filtered = filter_tool_stderr(&stderr);
        error!("{} failed: {}", tool, filtered);
        return Err(anyhow!("{} failed: {}", tool, filtered));
    }

    Ok(output.stdout)
}

/// Keep only meaningful stderr lines, dropping ffmpeg's banner and stream metadata
fn filter_tool_stderr(stderr: &str) -> String {
    let noise_prefixes = [
        "ffmpeg version",
        "built with",
        "configuration:",
        "lib",
        "Input #",
        "Metadata:",
        "Duration:",
        "Chapter",
        "Stream #",
        "Output #",
        "Stream mapping:",
        "Press [q]",
    ];

    let meaningful: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !noise_prefixes.iter().any(|p| line.starts_with(p)))
        .collect();

    if meaningful.is_empty() {
        "unknown error (stderr was empty after filtering)".to_string()
    } else {
        meaningful.join("\n")
    }
}

/// ffmpeg-based subtitle stream extractor
#[derive(Debug, Clone)]
pub struct FfmpegExtractor {
    binary: String,
    timeout: Duration,
    format: SubtitleFormat,
}

impl Default for FfmpegExtractor {
    fn default() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
            timeout: Duration::from_secs(120),
            format: SubtitleFormat::SubRip,
        }
    }
}

impl FfmpegExtractor {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
            ..Self::default()
        }
    }

    /// Subtitle format ffmpeg should convert the stream to
    pub fn with_format(mut self, format: SubtitleFormat) -> Self {
        self.format = format;
        self
    }
}

#[async_trait]
impl SubtitleExtractor for FfmpegExtractor {
    async fn extract_subtitle_stream(&self, video_path: &Path, stream_index: usize) -> Result<PathBuf> {
        if !video_path.exists() {
            return Err(anyhow!("Video file does not exist: {:?}", video_path));
        }

        let output_path = tempfile::Builder::new()
            .prefix("subtrans-")
            .suffix(&format!(".{}", self.format.extension()))
            .tempfile()
            .context("Failed to create temporary subtitle file")?
            .into_temp_path()
            .keep()
            .context("Failed to keep temporary subtitle file")?;

        let codec = match self.format {
            SubtitleFormat::SubRip => "srt",
            SubtitleFormat::WebVtt => "webvtt",
            SubtitleFormat::AdvancedSubStation => "ass",
        };

        let stream_map = format!("0:{}", stream_index);
        let mut command = Command::new(&self.binary);
        command
            .arg("-y")
            .arg("-i")
            .arg(video_path)
            .args(["-map", stream_map.as_str(), "-c:s", codec])
            .arg(&output_path);

        if let Err(e) = run_tool(command, "ffmpeg", self.timeout).await {
            let _ = std::fs::remove_file(&output_path);
            return Err(e);
        }

        let file_size = std::fs::metadata(&output_path)?.len();
        if file_size == 0 {
            let _ = std::fs::remove_file(&output_path);
            return Err(anyhow!("Extracted file is empty, no subtitles in stream {}", stream_index));
        }

        Ok(output_path)
    }
}

/// Wrapper around the `whisper` command-line tool
#[derive(Debug, Clone)]
pub struct WhisperCli {
    binary: String,
    timeout: Duration,
}

impl Default for WhisperCli {
    fn default() -> Self {
        Self {
            binary: "whisper".to_string(),
            timeout: Duration::from_secs(3600),
        }
    }
}

impl WhisperCli {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Transcriber for WhisperCli {
    async fn transcribe(&self, audio_path: &Path, options: &TranscribeOptions) -> Result<PathBuf> {
        if !audio_path.exists() {
            return Err(anyhow!("Input file does not exist: {:?}", audio_path));
        }

        let output_format = match options.output_format {
            SubtitleFormat::SubRip => "srt",
            SubtitleFormat::WebVtt => "vtt",
            SubtitleFormat::AdvancedSubStation => {
                return Err(anyhow!("whisper cannot write Advanced SubStation output"));
            }
        };

        let mut command = Command::new(&self.binary);
        command
            .arg(audio_path)
            .args(["--model", options.model.as_str()])
            .args(["--task", options.task.as_str()])
            .args(["--output_format", output_format])
            .arg("--output_dir")
            .arg(&options.output_dir);
        if let Some(language) = &options.language {
            command.args(["--language", language.as_str()]);
        }

        run_tool(command, "whisper", self.timeout).await?;

        let stem = audio_path.file_stem().unwrap_or_default().to_string_lossy();
        let produced = options.output_dir.join(format!("{}.{}", stem, output_format));
        if !produced.exists() {
            return Err(anyhow!("whisper finished but {:?} was not written", produced));
        }

        Ok(produced)
    }
}
