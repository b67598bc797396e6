/*!
 * Numbered-line prompt protocol shared by the remote providers.
 *
 * Requests list each caption as `[n] text` (1-based within the batch) and the
 * model is asked to answer in the same shape. Parsing the answer never fails:
 * numbered lines go to their slot, stray lines fill the first empty slot, and
 * anything still missing keeps the source text.
 */

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::subtitle_processor::SubtitleEntry;

/// Marker standing in for line breaks inside a single caption
pub const LINE_BREAK_MARKER: &str = "<br>";

// @const: A numbered response line, e.g. "[3] Bonjour"
static NUMBERED_LINE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[(\d+)\]\s?(.*)$").expect("valid numbered line regex"));

/// System prompt template for subtitle translation
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// The default system prompt
    pub const SUBTITLE_TRANSLATOR: &'static str = "You are a professional subtitle translator. \
Translate each numbered line from {source_language} to {target_language}.
Rules:
- Answer with exactly one line per input line, in the same order.
- Start every line with its number in square brackets, e.g. [1] translated text.
- Keep the <br> markers where they appear; they are line breaks.
- Do not merge, split, skip or add lines.
- Output only the translated lines, without notes or explanations.";

    /// Create a template from a string with `{source_language}` and `{target_language}` placeholders
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Render the template with the given language names
    pub fn render(&self, source_language: &str, target_language: &str) -> String {
        self.template
            .replace("{source_language}", source_language)
            .replace("{target_language}", target_language)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(Self::SUBTITLE_TRANSLATOR)
    }
}

/// Build the user message for a batch: one `[n] text` line per entry
pub fn build_batch_prompt(batch: &[SubtitleEntry]) -> String {
    batch
        .iter()
        .enumerate()
        .map(|(i, entry)| format!("[{}] {}", i + 1, encode_line_breaks(&entry.text)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Map a model response back onto the batch, one string per entry
pub fn parse_batch_response(response: &str, batch: &[SubtitleEntry]) -> Vec<String> {
    let mut slots: Vec<Option<String>> = vec![None; batch.len()];

    for line in response.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = NUMBERED_LINE_REGEX.captures(line) {
            match caps[1].parse::<usize>() {
                Ok(n) if n >= 1 && n <= slots.len() => {
                    slots[n - 1] = Some(decode_line_breaks(caps[2].trim()));
                }
                _ => debug!("Ignoring response line with out-of-range number: {}", line),
            }
        } else if let Some(slot) = slots.iter_mut().find(|slot| slot.is_none()) {
            *slot = Some(decode_line_breaks(line));
        } else {
            debug!("Ignoring surplus response line: {}", line);
        }
    }

    let missing = slots.iter().filter(|slot| slot.is_none()).count();
    if missing > 0 {
        warn!(
            "Response covered {}/{} entries; keeping source text for the rest",
            batch.len() - missing,
            batch.len()
        );
    }

    slots
        .into_iter()
        .zip(batch)
        .map(|(slot, entry)| slot.unwrap_or_else(|| entry.text.clone()))
        .collect()
}

fn encode_line_breaks(text: &str) -> String {
    text.replace('\n', LINE_BREAK_MARKER)
}

fn decode_line_breaks(text: &str) -> String {
    text.split(LINE_BREAK_MARKER)
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
}
