use std::fmt::Write;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::SubtitleError;
use crate::subtitle_processor::SubtitleEntry;
use super::{normalize_line_endings, split_blocks};

// @const: SRT timing line, accepting either ',' or '.' before the milliseconds
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d+):(\d{2}):(\d{2})[,.](\d{3})\s*-->\s*(\d+):(\d{2}):(\d{2})[,.](\d{3})")
        .expect("valid SRT timestamp regex")
});

/// Parse SRT content, skipping blocks that are not index + timing + text
pub fn parse(content: &str) -> Vec<SubtitleEntry> {
    let normalized = normalize_line_endings(content);
    let mut entries = Vec::new();

    for (block_index, block) in split_blocks(&normalized).iter().enumerate() {
        match parse_block(block, entries.len() + 1) {
            Ok(entry) => entries.push(entry),
            Err(e) => debug!("Skipping block {}: {}", block_index + 1, e),
        }
    }

    entries
}

fn parse_block(lines: &[&str], seq_num: usize) -> Result<SubtitleEntry, SubtitleError> {
    if lines.len() < 3 {
        return Err(malformed(format!("expected at least 3 lines, found {}", lines.len())));
    }

    if lines[0].trim().parse::<u64>().is_err() {
        return Err(malformed(format!("'{}' is not a numeric index", lines[0].trim())));
    }

    let caps = TIMESTAMP_REGEX
        .captures(lines[1])
        .ok_or_else(|| malformed(format!("'{}' is not a timing line", lines[1])))?;

    let start = timestamp_from_captures(&caps, 1)?;
    let end = timestamp_from_captures(&caps, 5)?;
    let text = lines[2..].join("\n");

    Ok(SubtitleEntry::new(seq_num, start, end, text))
}

fn timestamp_from_captures(caps: &regex::Captures, start_idx: usize) -> Result<u64, SubtitleError> {
    let mut parts = [0u64; 4];
    for (offset, part) in parts.iter_mut().enumerate() {
        *part = caps
            .get(start_idx + offset)
            .and_then(|m| m.as_str().parse().ok())
            .ok_or_else(|| malformed("timestamp component out of range".to_string()))?;
    }

    let [hours, minutes, seconds, millis] = parts;
    if minutes >= 60 || seconds >= 60 {
        return Err(malformed(format!("invalid time {:02}:{:02}:{:02}", hours, minutes, seconds)));
    }

    SubtitleEntry::components_to_ms(hours, minutes, seconds, millis)
        .ok_or_else(|| malformed(format!("hour {} is too large", hours)))
}

fn malformed(reason: String) -> SubtitleError {
    SubtitleError::MalformedBlock { format: "SubRip".to_string(), reason }
}

/// Serialize entries as SRT, renumbering from 1
pub fn serialize(entries: &[SubtitleEntry]) -> String {
    let mut out = String::new();
    for (i, entry) in entries.iter().enumerate() {
        let _ = write!(
            out,
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            SubtitleEntry::format_timestamp(entry.start_time_ms, ','),
            SubtitleEntry::format_timestamp(entry.end_time_ms, ','),
            entry.text
        );
    }
    out
}
