/*!
 * Per-format parsers and serializers.
 *
 * Each submodule exposes `parse(&str) -> Vec<SubtitleEntry>` which skips
 * malformed blocks, and `serialize(&[SubtitleEntry]) -> String`.
 */

pub mod ass;
pub mod srt;
pub mod vtt;

/// Normalize `\r\n` and lone `\r` to `\n` and drop a leading byte order mark
pub(crate) fn normalize_line_endings(content: &str) -> String {
    content
        .trim_start_matches('\u{feff}')
        .replace("\r\n", "\n")
        .replace('\r', "\n")
}

/// Split normalized content into blocks of non-blank lines.
///
/// Any run of one or more blank (whitespace-only) lines separates blocks.
pub(crate) fn split_blocks(content: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line.trim_end());
        }
    }

    if !current.is_empty() {
        blocks.push(current);
    }

    blocks
}
