/*!
 * Shared HTTP plumbing for the remote providers.
 */

use std::time::Duration;
use log::error;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::errors::ProviderError;

/// Build a reqwest client with the given request timeout
pub fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .unwrap_or_default()
}

/// Join a base endpoint and a path, validating the result as a URL
pub fn endpoint_url(base: &str, path: &str) -> Result<Url, ProviderError> {
    let joined = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    Url::parse(&joined).map_err(|e| ProviderError::RequestFailed(format!("Invalid endpoint '{}': {}", joined, e)))
}

/// Send a prepared JSON request and decode the JSON response.
///
/// Non-success statuses become [`ProviderError::ApiError`] (or
/// [`ProviderError::AuthenticationError`] for 401/403) so the retry layer can
/// classify them by status code.
pub async fn send_json<T: DeserializeOwned>(request: RequestBuilder, provider: &str) -> Result<T, ProviderError> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() || e.is_connect() {
            ProviderError::ConnectionError(format!("{} request failed: {}", provider, e))
        } else {
            ProviderError::RequestFailed(format!("{} request failed: {}", provider, e))
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to get error response text".to_string());
        error!("{} API error ({}): {}", provider, status, error_text);

        return Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ProviderError::AuthenticationError(format!("{} rejected the API key: {}", provider, error_text))
            }
            _ => ProviderError::ApiError {
                status_code: status.as_u16(),
                message: error_text,
            },
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ProviderError::ParseError(format!("{} response: {}", provider, e)))
}
