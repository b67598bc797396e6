/*!
 * # subtrans - timed subtitle translation with AI providers
 *
 * A Rust library for translating subtitle files between languages while
 * keeping every caption's timing intact.
 *
 * ## Features
 *
 * - Read and write SubRip, WebVTT and Advanced SubStation files
 * - Translate captions in bounded batches through:
 *   - OpenAI API
 *   - Anthropic API
 *   - Gemini API
 *   - Kimi (Moonshot) API
 *   - a local whisper model, for audio into English
 * - Retry transient API failures with exponential backoff
 * - Extract subtitle streams from video files with ffmpeg
 * - ISO 639-1 and ISO 639-2 language code support
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `subtitle_processor`: caption model, format detection, parse and serialize
 *   - `formats`: the per-format codecs
 * - `translation`: batching, prompt protocol, retry and the merge loop
 * - `providers`: the provider trait, its backends and provider selection
 * - `media`: ffmpeg and whisper process wrappers
 * - `app_config`: Configuration management
 * - `app_controller`: Job runner used by the command-line tool
 * - `file_utils`: File system operations
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod formats;
pub mod language_utils;
pub mod media;
pub mod providers;
pub mod subtitle_processor;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{AppError, ProviderError, SubtitleError, TranslationError};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
pub use providers::{create_provider, Credentials, ProviderKind, ProviderOptions, TranslationProvider, UsageStats};
pub use subtitle_processor::{detect_format, parse, serialize, SubtitleCollection, SubtitleEntry, SubtitleFormat};
pub use translation::{split, translate_and_merge, Batch, BatchingConfig, MergeOptions, RetryPolicy, TranslationService};
