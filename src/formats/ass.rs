use std::collections::HashMap;
use std::fmt::Write;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::SubtitleError;
use crate::subtitle_processor::SubtitleEntry;
use super::normalize_line_endings;

// @const: Style override blocks such as {\i1} or {\pos(10,20)}
static OVERRIDE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[^}]*\}").expect("valid override regex"));

// @const: ASS timestamp H:MM:SS.cc
static TIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+):(\d{1,2}):(\d{1,2})[.:](\d{2})$").expect("valid ASS time regex")
});

/// Column order used when a Dialogue line appears before any Format line
const DEFAULT_EVENT_COLUMNS: [&str; 10] = [
    "layer", "start", "end", "style", "name", "marginl", "marginr", "marginv", "effect", "text",
];

const SCRIPT_HEADER: &str = "[Script Info]
ScriptType: v4.00+
PlayResX: 384
PlayResY: 288
WrapStyle: 0
ScaledBorderAndShadow: yes

[V4+ Styles]
Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding
Style: Default,Arial,20,&H00FFFFFF,&H000000FF,&H00000000,&H00000000,0,0,0,0,100,100,0,0,1,2,2,2,10,10,10,1

[Events]
Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text
";

/// Column layout of the `[Events]` section, looked up by name
#[derive(Debug, Clone)]
struct EventColumns {
    count: usize,
    index: HashMap<String, usize>,
}

impl EventColumns {
    fn from_names<'a>(names: impl Iterator<Item = &'a str>) -> Self {
        let names: Vec<String> = names.map(|name| name.trim().to_ascii_lowercase()).collect();
        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            index.entry(name.clone()).or_insert(i);
        }
        Self { count: names.len(), index }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }
}

/// Parse ASS/SSA content. Only `Dialogue:` lines of the `[Events]` section produce entries.
pub fn parse(content: &str) -> Vec<SubtitleEntry> {
    let normalized = normalize_line_endings(content);
    let mut entries = Vec::new();
    let mut in_events = false;
    let mut columns: Option<EventColumns> = None;

    for (line_number, raw_line) in normalized.lines().enumerate() {
        let line = raw_line.trim();

        if line.starts_with('[') && line.ends_with(']') {
            in_events = line.eq_ignore_ascii_case("[events]");
            continue;
        }
        if !in_events {
            continue;
        }

        if let Some(rest) = line.strip_prefix("Format:") {
            columns = Some(EventColumns::from_names(rest.split(',')));
        } else if let Some(rest) = line.strip_prefix("Dialogue:") {
            let layout = columns
                .get_or_insert_with(|| EventColumns::from_names(DEFAULT_EVENT_COLUMNS.into_iter()));
            match parse_dialogue(rest, layout, entries.len() + 1) {
                Ok(entry) => entries.push(entry),
                Err(e) => debug!("Skipping line {}: {}", line_number + 1, e),
            }
        }
    }

    entries
}

fn parse_dialogue(fields: &str, columns: &EventColumns, seq_num: usize) -> Result<SubtitleEntry, SubtitleError> {
    // Only the first N-1 commas delimit; the text column keeps the rest
    let values: Vec<&str> = fields.trim_start().splitn(columns.count, ',').collect();
    if values.len() < columns.count {
        return Err(malformed(format!(
            "expected {} fields, found {}",
            columns.count,
            values.len()
        )));
    }

    let field = |name: &str| {
        columns
            .position(name)
            .map(|i| values[i])
            .ok_or_else(|| malformed(format!("Format line has no '{}' column", name)))
    };

    let start = parse_timestamp(field("start")?)?;
    let end = parse_timestamp(field("end")?)?;
    let text = clean_text(field("text")?);

    Ok(SubtitleEntry::new(seq_num, start, end, text))
}

/// Parse `H:MM:SS.cc` into milliseconds
pub fn parse_timestamp(timestamp: &str) -> Result<u64, SubtitleError> {
    let caps = TIME_REGEX
        .captures(timestamp.trim())
        .ok_or_else(|| malformed(format!("'{}' is not a timestamp", timestamp)))?;

    let number = |i: usize| {
        caps[i]
            .parse::<u64>()
            .map_err(|_| malformed(format!("'{}' is out of range", timestamp)))
    };
    let (hours, minutes, seconds, centis) = (number(1)?, number(2)?, number(3)?, number(4)?);

    if minutes >= 60 || seconds >= 60 {
        return Err(malformed(format!("'{}' is out of range", timestamp)));
    }

    SubtitleEntry::components_to_ms(hours, minutes, seconds, centis * 10)
        .ok_or_else(|| malformed(format!("'{}' is out of range", timestamp)))
}

/// Format milliseconds as `H:MM:SS.cc`, rounding to the nearest centisecond
pub fn format_timestamp(ms: u64) -> String {
    let total_centis = ms.saturating_add(5) / 10;
    let hours = total_centis / 360_000;
    let minutes = (total_centis % 360_000) / 6_000;
    let seconds = (total_centis % 6_000) / 100;
    let centis = total_centis % 100;

    format!("{}:{:02}:{:02}.{:02}", hours, minutes, seconds, centis)
}

fn clean_text(raw: &str) -> String {
    OVERRIDE_REGEX
        .replace_all(raw, "")
        .replace("\\N", "\n")
        .replace("\\n", "\n")
        .replace("\\h", " ")
        .trim()
        .to_string()
}

fn malformed(reason: String) -> SubtitleError {
    SubtitleError::MalformedBlock { format: "Advanced SubStation".to_string(), reason }
}

/// Serialize entries under a fixed default style; original styling is not kept
pub fn serialize(entries: &[SubtitleEntry]) -> String {
    let mut out = String::from(SCRIPT_HEADER);
    for entry in entries {
        let _ = writeln!(
            out,
            "Dialogue: 0,{},{},Default,,0,0,0,,{}",
            format_timestamp(entry.start_time_ms),
            format_timestamp(entry.end_time_ms),
            entry.text.replace('\n', "\\N")
        );
    }
    out
}
