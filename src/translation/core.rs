/*!
 * Core translation service implementation.
 *
 * Drives batches through a provider one at a time and splices every
 * translation back into the caption at the batch's original position. Timings
 * are never touched and the output has exactly as many captions as the input.
 */

use log::{debug, error, info};
use std::time::{Duration, Instant};

use crate::errors::TranslationError;
use crate::providers::{TranslationProvider, UsageStats};
use crate::subtitle_processor::{SubtitleCollection, SubtitleEntry};
use super::batch::{split_with_config, Batch, BatchingConfig};

/// Options for the merge loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeOptions {
    /// Pause between consecutive batches; never applied after the last one
    pub batch_delay: Duration,
}

impl MergeOptions {
    pub fn new(batch_delay: Duration) -> Self {
        Self { batch_delay }
    }
}

/// Result of translating one caption sequence
#[derive(Debug, Clone)]
pub struct TranslationOutcome {
    /// Translated captions, same length and order as the input
    pub entries: Vec<SubtitleEntry>,
    /// Provider usage spent on this sequence
    pub stats: UsageStats,
    /// Wall time spent, including backoff and inter-batch delays
    pub elapsed: Duration,
}

/// Translate `batches` and merge the results into a copy of `captions`
pub async fn translate_and_merge(
    captions: &[SubtitleEntry],
    batches: &[Batch<'_>],
    provider: &dyn TranslationProvider,
    options: &MergeOptions,
) -> Result<TranslationOutcome, TranslationError> {
    translate_and_merge_with_progress(captions, batches, provider, options, |_, _| {}).await
}

/// Same as [`translate_and_merge`], reporting `(completed_batches, total_batches)`
/// after each batch
pub async fn translate_and_merge_with_progress<F>(
    captions: &[SubtitleEntry],
    batches: &[Batch<'_>],
    provider: &dyn TranslationProvider,
    options: &MergeOptions,
    mut progress: F,
) -> Result<TranslationOutcome, TranslationError>
where
    F: FnMut(usize, usize),
{
    let start = Instant::now();
    let stats_before = provider.stats();
    let total_batches = batches.len();

    for batch in batches {
        if batch.offset + batch.len() > captions.len() {
            return Err(TranslationError::BatchOutOfRange {
                offset: batch.offset,
                len: batch.len(),
                total: captions.len(),
            });
        }
    }

    let mut merged = captions.to_vec();

    for (index, batch) in batches.iter().enumerate() {
        let batch_number = index + 1;
        debug!(
            "Translating batch {}/{} ({} captions starting at {})",
            batch_number,
            total_batches,
            batch.len(),
            batch.offset
        );

        let translations = provider.translate_batch(batch.entries).await.map_err(|source| {
            error!("Batch {}/{} failed: {}", batch_number, total_batches, source);
            TranslationError::BatchFailed {
                batch_number,
                total_batches,
                source,
            }
        })?;

        if translations.len() != batch.len() {
            return Err(TranslationError::LengthMismatch {
                expected: batch.len(),
                actual: translations.len(),
            });
        }

        for (entry, text) in merged[batch.range()].iter_mut().zip(translations) {
            entry.text = text;
        }

        progress(batch_number, total_batches);

        if batch_number < total_batches && !options.batch_delay.is_zero() {
            tokio::time::sleep(options.batch_delay).await;
        }
    }

    let stats = provider.stats().since(&stats_before);
    let elapsed = start.elapsed();
    info!(
        "Translated {} captions in {} batches ({:.1}s, {} API calls)",
        merged.len(),
        total_batches,
        elapsed.as_secs_f64(),
        stats.calls
    );

    Ok(TranslationOutcome {
        entries: merged,
        stats,
        elapsed,
    })
}

/// Main translation service for subtitle translation
#[derive(Debug)]
pub struct TranslationService {
    provider: Box<dyn TranslationProvider>,
    /// Batch size limits
    pub batching: BatchingConfig,
    /// Merge loop options
    pub options: MergeOptions,
}

impl TranslationService {
    pub fn new(provider: Box<dyn TranslationProvider>, batching: BatchingConfig, options: MergeOptions) -> Self {
        Self {
            provider,
            batching,
            options,
        }
    }

    pub fn provider(&self) -> &dyn TranslationProvider {
        self.provider.as_ref()
    }

    /// Split a collection into batches and translate it
    pub async fn translate_collection(
        &self,
        collection: &SubtitleCollection,
    ) -> Result<TranslationOutcome, TranslationError> {
        self.translate_collection_with_progress(collection, |_, _| {}).await
    }

    /// Same as [`TranslationService::translate_collection`] with a progress callback
    pub async fn translate_collection_with_progress<F>(
        &self,
        collection: &SubtitleCollection,
        progress: F,
    ) -> Result<TranslationOutcome, TranslationError>
    where
        F: FnMut(usize, usize),
    {
        let batches = split_with_config(&collection.entries, &self.batching);
        translate_and_merge_with_progress(
            &collection.entries,
            &batches,
            self.provider.as_ref(),
            &self.options,
            progress,
        )
        .await
    }
}
