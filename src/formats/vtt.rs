use std::fmt::Write;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::SubtitleError;
use crate::subtitle_processor::SubtitleEntry;
use super::{normalize_line_endings, split_blocks};

// @const: Cue timing line; the hour component is optional, cue settings may follow
static TIMING_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*((?:\d+:)?\d{2}:\d{2}[.,]\d{3})\s*-->\s*((?:\d+:)?\d{2}:\d{2}[.,]\d{3})")
        .expect("valid WebVTT timing regex")
});

// @const: Inline markup such as <i>, <c.yellow>, <00:00:01.000>
static TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

/// Block kinds that carry no cue
const SKIPPED_BLOCKS: [&str; 3] = ["NOTE", "STYLE", "REGION"];

/// Parse WebVTT content, numbering cues from 1 regardless of cue identifiers
pub fn parse(content: &str) -> Vec<SubtitleEntry> {
    let normalized = normalize_line_endings(content);
    let mut entries = Vec::new();

    for (block_index, block) in split_blocks(&normalized).iter().enumerate() {
        let first = block[0].trim_start();

        if block_index == 0 && first.starts_with("WEBVTT") {
            continue;
        }
        if SKIPPED_BLOCKS.iter().any(|kind| first == *kind || first.starts_with(&format!("{} ", kind))) {
            continue;
        }

        match parse_cue(block, entries.len() + 1) {
            Ok(entry) => entries.push(entry),
            Err(e) => debug!("Skipping cue block {}: {}", block_index + 1, e),
        }
    }

    entries
}

fn parse_cue(lines: &[&str], seq_num: usize) -> Result<SubtitleEntry, SubtitleError> {
    // An optional identifier line may precede the timing line
    let timing_index = lines
        .iter()
        .take(2)
        .position(|line| line.contains("-->"))
        .ok_or_else(|| malformed("no timing line".to_string()))?;

    let caps = TIMING_REGEX
        .captures(lines[timing_index])
        .ok_or_else(|| malformed(format!("'{}' is not a valid timing line", lines[timing_index])))?;

    let start = parse_timestamp(&caps[1])?;
    let end = parse_timestamp(&caps[2])?;

    let text_lines = &lines[timing_index + 1..];
    if text_lines.is_empty() {
        return Err(malformed("cue has no text".to_string()));
    }

    let text = text_lines
        .iter()
        .map(|line| decode_entities(&TAG_REGEX.replace_all(line, "")))
        .collect::<Vec<_>>()
        .join("\n");

    Ok(SubtitleEntry::new(seq_num, start, end, text))
}

/// Parse `HH:MM:SS.mmm` or `MM:SS.mmm` into milliseconds
pub fn parse_timestamp(timestamp: &str) -> Result<u64, SubtitleError> {
    let (clock, millis) = timestamp
        .trim()
        .rsplit_once(['.', ','])
        .ok_or_else(|| malformed(format!("'{}' has no milliseconds", timestamp)))?;

    let numbers = clock
        .split(':')
        .map(|part| part.parse::<u64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| malformed(format!("'{}' is not a timestamp", timestamp)))?;

    let (hours, minutes, seconds) = match numbers.as_slice() {
        [m, s] => (0, *m, *s),
        [h, m, s] => (*h, *m, *s),
        _ => return Err(malformed(format!("'{}' is not a timestamp", timestamp))),
    };

    let millis: u64 = millis
        .parse()
        .map_err(|_| malformed(format!("'{}' has invalid milliseconds", timestamp)))?;

    if minutes >= 60 || seconds >= 60 || millis >= 1000 {
        return Err(malformed(format!("'{}' is out of range", timestamp)));
    }

    SubtitleEntry::components_to_ms(hours, minutes, seconds, millis)
        .ok_or_else(|| malformed(format!("'{}' is too large", timestamp)))
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

fn encode_entities(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn malformed(reason: String) -> SubtitleError {
    SubtitleError::MalformedBlock { format: "WebVTT".to_string(), reason }
}

/// Serialize entries as WebVTT with numeric cue identifiers
pub fn serialize(entries: &[SubtitleEntry]) -> String {
    let mut out = String::from("WEBVTT\n\n");
    for (i, entry) in entries.iter().enumerate() {
        let _ = write!(
            out,
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            SubtitleEntry::format_timestamp(entry.start_time_ms, '.'),
            SubtitleEntry::format_timestamp(entry.end_time_ms, '.'),
            encode_entities(&entry.text)
        );
    }
    out
}
