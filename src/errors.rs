/*!
 * Error types for the subtrans application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// HTTP status codes that indicate a transient failure worth retrying
pub const RETRYABLE_STATUS_CODES: [u16; 4] = [429, 500, 502, 503];

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// A provider that needs an API key was selected but none was resolved
    #[error("Missing API key for {provider}: set {env_var} or pass an explicit key")]
    MissingApiKey {
        /// Provider display name
        provider: String,
        /// Environment variable the key is read from
        env_var: String,
    },

    /// The provider cannot perform the requested operation
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
}

impl ProviderError {
    /// Whether the error denotes HTTP 429, 500, 502 or 503
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ApiError { status_code, .. } => RETRYABLE_STATUS_CODES.contains(status_code),
            _ => false,
        }
    }
}

/// Errors that can occur during subtitle processing
#[derive(Error, Debug)]
pub enum SubtitleError {
    /// A single structural block could not be decoded; parsers skip these
    #[error("Malformed {format} block: {reason}")]
    MalformedBlock {
        /// Format being parsed
        format: String,
        /// What was wrong with the block
        reason: String,
    },

    /// No caption at all could be decoded from the content
    #[error("No subtitle entries could be parsed from {format} content")]
    Empty {
        /// Format that was attempted
        format: String,
    },

    /// Reading or writing a subtitle file failed
    #[error("Subtitle file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur during translation
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error with subtitle processing
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// A batch failed; the whole file is abandoned
    #[error("Batch {batch_number} of {total_batches} failed: {source}")]
    BatchFailed {
        /// 1-based batch number
        batch_number: usize,
        /// Number of batches in the job
        total_batches: usize,
        /// Underlying provider failure
        #[source]
        source: ProviderError,
    },

    /// The provider broke the one-string-per-caption contract
    #[error("Provider returned {actual} translations for a batch of {expected}")]
    LengthMismatch {
        /// Number of captions sent
        expected: usize,
        /// Number of strings received
        actual: usize,
    },

    /// A batch does not fit inside the caption sequence it claims to cover
    #[error("Batch at offset {offset} with {len} entries exceeds sequence of {total}")]
    BatchOutOfRange {
        /// Offset of the batch
        offset: usize,
        /// Batch length
        len: usize,
        /// Length of the full sequence
        total: usize,
    },
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from subtitle processing
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
