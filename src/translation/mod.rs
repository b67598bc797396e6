/*!
 * Subtitle translation through pluggable providers.
 *
 * - `batch`: splitting a caption sequence into bounded batches
 * - `prompts`: the numbered-line prompt protocol
 * - `retry`: exponential backoff around a single provider call
 * - `core`: the merge loop and the translation service
 */

pub use self::batch::{split, split_with_config, Batch, BatchingConfig};
pub use self::core::{translate_and_merge, translate_and_merge_with_progress, MergeOptions, TranslationOutcome, TranslationService};
pub use self::prompts::PromptTemplate;
pub use self::retry::{with_retry, RetryPolicy};

pub mod batch;
pub mod core;
pub mod prompts;
pub mod retry;
