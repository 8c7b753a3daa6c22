//! HTTP retry helpers for transient errors.
//!
//! Fetchers use [`send_json`] and [`send_bytes`] instead of calling
//! `reqwest::RequestBuilder::send()` directly, so every request gets
//! bounded retry with exponential backoff on connection failures,
//! timeouts, rate limiting, and server errors. Client errors (4xx other
//! than 429) and malformed response bodies are permanent and abort
//! immediately.

use std::time::Duration;

use crate::SourceError;

/// Maximum retry attempts for transient HTTP errors. With exponential
/// backoff (2s, 4s, 8s) the total wait before giving up is 14 seconds.
const MAX_RETRIES: u32 = 3;

/// Sends a request and parses the response body as JSON.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`], since builders are consumed by
/// `.send()`.
///
/// # Errors
///
/// Returns [`SourceError`] if the request fails after all retries, the
/// server returns a non-retryable status, or the body is not valid JSON.
pub async fn send_json<F>(build_request: F) -> Result<serde_json::Value, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let response = send_inner(&build_request).await?;
    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
}

/// Sends a request and returns the raw response body.
///
/// # Errors
///
/// Returns [`SourceError`] if the request fails after all retries or the
/// server returns a non-retryable status.
pub async fn send_bytes<F>(build_request: F) -> Result<Vec<u8>, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let response = send_inner(&build_request).await?;
    Ok(response.bytes().await?.to_vec())
}

/// Retry loop shared by the body-shape helpers.
async fn send_inner<F>(build_request: &F) -> Result<reqwest::Response, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt: u32 = 0;

    loop {
        let result = build_request().send().await;

        let retryable = match &result {
            Ok(response) => {
                let status = response.status();
                status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            Err(e) => e.is_connect() || e.is_timeout(),
        };

        if retryable && attempt < MAX_RETRIES {
            attempt += 1;
            let delay = Duration::from_secs(1u64 << attempt);
            match &result {
                Ok(response) => log::warn!(
                    "HTTP {} from {}, retry {attempt}/{MAX_RETRIES} in {delay:?}",
                    response.status(),
                    response.url()
                ),
                Err(e) => {
                    log::warn!("Request failed ({e}), retry {attempt}/{MAX_RETRIES} in {delay:?}");
                }
            }
            tokio::time::sleep(delay).await;
            continue;
        }

        return Ok(result?.error_for_status()?);
    }
}
