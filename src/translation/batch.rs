/*!
 * Batch splitting of subtitle entries.
 *
 * Splits an ordered caption sequence into contiguous, bounded batches that
 * borrow from the original sequence and remember where they start in it.
 */

use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::subtitle_processor::SubtitleEntry;

/// Limits applied when splitting entries into batches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchingConfig {
    /// Maximum number of entries per batch
    #[serde(default = "default_max_entries_per_batch")]
    pub max_entries_per_batch: usize,

    /// Maximum total characters per batch (a single oversized entry may exceed it)
    #[serde(default = "default_max_chars_per_batch")]
    pub max_chars_per_batch: usize,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            max_entries_per_batch: default_max_entries_per_batch(),
            max_chars_per_batch: default_max_chars_per_batch(),
        }
    }
}

fn default_max_entries_per_batch() -> usize {
    40
}

fn default_max_chars_per_batch() -> usize {
    4000
}

/// A contiguous run of entries borrowed from the full sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch<'a> {
    /// Index of the first entry of this batch in the full sequence
    pub offset: usize,
    /// The entries themselves
    pub entries: &'a [SubtitleEntry],
}

impl<'a> Batch<'a> {
    /// Number of entries in the batch
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the batch has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total characters of the batch's text
    pub fn char_count(&self) -> usize {
        self.entries.iter().map(SubtitleEntry::char_count).sum()
    }

    /// Range of positions covered in the full sequence
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.entries.len()
    }
}

/// Split entries into ordered batches.
///
/// A batch is closed before an entry that would push it past `max_count`
/// entries, or past `max_total_chars` characters when it already holds
/// something. An entry longer than `max_total_chars` therefore always ends up
/// alone in its batch rather than being cut.
pub fn split(entries: &[SubtitleEntry], max_count: usize, max_total_chars: usize) -> Vec<Batch<'_>> {
    let max_count = max_count.max(1);
    let mut batches = Vec::new();
    let mut start = 0;
    let mut current_chars = 0;

    for (i, entry) in entries.iter().enumerate() {
        let entry_chars = entry.char_count();
        let current_len = i - start;

        let over_count = current_len + 1 > max_count;
        let over_chars = current_len > 0 && current_chars + entry_chars > max_total_chars;

        if over_count || over_chars {
            batches.push(Batch { offset: start, entries: &entries[start..i] });
            start = i;
            current_chars = 0;
        }

        current_chars += entry_chars;
    }

    if start < entries.len() {
        batches.push(Batch { offset: start, entries: &entries[start..] });
    }

    let total_batched: usize = batches.iter().map(Batch::len).sum();
    if total_batched != entries.len() {
        error!(
            "Lost entries during batching! Original: {}, after batching: {}",
            entries.len(),
            total_batched
        );
    } else if log::max_level() >= log::LevelFilter::Debug {
        for (i, batch) in batches.iter().enumerate() {
            debug!(
                "Batch {}: entries {}..{} ({} chars)",
                i + 1,
                batch.offset + 1,
                batch.offset + batch.len(),
                batch.char_count()
            );
        }
    }

    batches
}

/// Split with the limits from a [`BatchingConfig`]
pub fn split_with_config<'a>(entries: &'a [SubtitleEntry], config: &BatchingConfig) -> Vec<Batch<'a>> {
    split(entries, config.max_entries_per_batch, config.max_chars_per_batch)
}
