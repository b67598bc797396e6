use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use anyhow::anyhow;
use log::{debug, warn};

use crate::errors::SubtitleError;
use crate::formats::{ass, srt, vtt};

// @module: Subtitle model, format detection and codec dispatch

// @struct: Single subtitle entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEntry {
    // @field: Sequence number, assigned from parse order
    pub seq_num: usize,

    // @field: Start time in ms
    pub start_time_ms: u64,

    // @field: End time in ms
    pub end_time_ms: u64,

    // @field: Subtitle text, lines separated by '\n'
    pub text: String,
}

impl SubtitleEntry {
    /// Creates a new subtitle entry
    pub fn new(seq_num: usize, start_time_ms: u64, end_time_ms: u64, text: impl Into<String>) -> Self {
        SubtitleEntry {
            seq_num,
            start_time_ms,
            end_time_ms,
            text: text.into(),
        }
    }

    /// Number of characters in the text, as counted for batching
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Convert start time to formatted SRT timestamp
    pub fn format_start_time(&self) -> String {
        Self::format_timestamp(self.start_time_ms, ',')
    }

    /// Convert end time to formatted SRT timestamp
    pub fn format_end_time(&self) -> String {
        Self::format_timestamp(self.end_time_ms, ',')
    }

    /// Format milliseconds as `HH:MM:SS{sep}mmm`
    pub fn format_timestamp(ms: u64, millis_separator: char) -> String {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02}{}{:03}", hours, minutes, seconds, millis_separator, millis)
    }

    /// Convert hour/minute/second/millisecond components to milliseconds,
    /// or `None` when the total does not fit in a `u64`
    pub fn components_to_ms(hours: u64, minutes: u64, seconds: u64, millis: u64) -> Option<u64> {
        hours
            .checked_mul(3600)?
            .checked_add(minutes.checked_mul(60)?)?
            .checked_add(seconds)?
            .checked_mul(1000)?
            .checked_add(millis)
    }
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.seq_num)?;
        writeln!(f, "{} --> {}", self.format_start_time(), self.format_end_time())?;
        writeln!(f, "{}", self.text)?;
        writeln!(f)
    }
}

/// Supported timed-text formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubtitleFormat {
    /// SubRip (`.srt`)
    SubRip,
    /// WebVTT (`.vtt`)
    WebVtt,
    /// Advanced SubStation Alpha (`.ass`, `.ssa`)
    AdvancedSubStation,
}

impl SubtitleFormat {
    /// Map a file extension (without the dot, any case) to a format
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "srt" => Some(Self::SubRip),
            "vtt" => Some(Self::WebVtt),
            "ass" | "ssa" => Some(Self::AdvancedSubStation),
            _ => None,
        }
    }

    /// Map a path's extension to a format
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Canonical file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::SubRip => "srt",
            Self::WebVtt => "vtt",
            Self::AdvancedSubStation => "ass",
        }
    }

    /// Human readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::SubRip => "SubRip",
            Self::WebVtt => "WebVTT",
            Self::AdvancedSubStation => "Advanced SubStation",
        }
    }
}

impl fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for SubtitleFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "subrip" => Ok(Self::SubRip),
            "webvtt" => Ok(Self::WebVtt),
            "advancedsubstation" => Ok(Self::AdvancedSubStation),
            other => Self::from_extension(other)
                .ok_or_else(|| anyhow!("Invalid subtitle format: {}", s)),
        }
    }
}

/// Detect the format of subtitle content.
///
/// The filename extension wins when it is recognised. Otherwise the content is
/// sniffed: a leading `WEBVTT` marker means WebVTT, a `[Script Info]` section or
/// an events `Format: Layer` line means ASS, and anything else is treated as SubRip.
pub fn detect_format(content: &str, filename: Option<&Path>) -> SubtitleFormat {
    if let Some(format) = filename.and_then(SubtitleFormat::from_path) {
        return format;
    }

    let head = content.trim_start_matches('\u{feff}').trim_start();
    if head.starts_with("WEBVTT") {
        SubtitleFormat::WebVtt
    } else if content.contains("[Script Info]") || content.contains("Format: Layer") {
        SubtitleFormat::AdvancedSubStation
    } else {
        SubtitleFormat::SubRip
    }
}

/// Parse subtitle content into an ordered caption sequence.
///
/// Malformed blocks are skipped. Fails only when nothing could be decoded.
pub fn parse(content: &str, format: SubtitleFormat) -> Result<Vec<SubtitleEntry>, SubtitleError> {
    let mut entries = match format {
        SubtitleFormat::SubRip => srt::parse(content),
        SubtitleFormat::WebVtt => vtt::parse(content),
        SubtitleFormat::AdvancedSubStation => ass::parse(content),
    };

    if entries.is_empty() {
        warn!("No valid {} entries found in content", format);
        return Err(SubtitleError::Empty { format: format.to_string() });
    }

    for (i, entry) in entries.iter_mut().enumerate() {
        entry.seq_num = i + 1;
    }

    debug!("Parsed {} {} entries", entries.len(), format);
    Ok(entries)
}

/// Serialize captions in the given format, renumbering from 1
pub fn serialize(entries: &[SubtitleEntry], format: SubtitleFormat) -> String {
    match format {
        SubtitleFormat::SubRip => srt::serialize(entries),
        SubtitleFormat::WebVtt => vtt::serialize(entries),
        SubtitleFormat::AdvancedSubStation => ass::serialize(entries),
    }
}

/// Collection of subtitle entries with metadata
#[derive(Debug, Clone)]
pub struct SubtitleCollection {
    /// Source filename
    pub source_file: PathBuf,

    /// List of subtitle entries
    pub entries: Vec<SubtitleEntry>,

    /// Format the entries were decoded from
    pub format: SubtitleFormat,
}

impl SubtitleCollection {
    /// Create an empty collection
    pub fn new(source_file: PathBuf, format: SubtitleFormat) -> Self {
        SubtitleCollection {
            source_file,
            entries: Vec::new(),
            format,
        }
    }

    /// Parse content, detecting the format from `source_file` or the content itself
    pub fn from_string(content: &str, source_file: PathBuf) -> Result<Self, SubtitleError> {
        let format = detect_format(content, Some(&source_file));
        let entries = parse(content, format)?;
        Ok(Self { source_file, entries, format })
    }

    /// Read and parse a subtitle file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SubtitleError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        Self::from_string(&content, path.to_path_buf())
    }

    /// Render the collection in a format
    pub fn to_format_string(&self, format: SubtitleFormat) -> String {
        serialize(&self.entries, format)
    }

    /// Write the collection to `path` in the given format
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P, format: SubtitleFormat) -> Result<(), SubtitleError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_format_string(format))?;
        Ok(())
    }

    /// Total number of characters across all entries
    pub fn total_chars(&self) -> usize {
        self.entries.iter().map(SubtitleEntry::char_count).sum()
    }
}

impl fmt::Display for SubtitleCollection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Subtitle Collection")?;
        writeln!(f, "Source: {:?}", self.source_file)?;
        writeln!(f, "Format: {}", self.format)?;
        writeln!(f, "Entries: {}", self.entries.len())?;
        Ok(())
    }
}
