//! Shared HTTP plumbing for the adapters: client construction and mapping
//! of transport/status failures into `ProviderError`.

use serde::de::DeserializeOwned;
use std::time::Duration;
use stepwise_core::ProviderError;
use tracing::warn;

pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::NotConfigured(format!("Failed to create HTTP client: {e}")))
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

/// Send a prepared request and decode a successful JSON body as `T`.
///
/// Non-2xx responses become `ProviderError::Http` with the body text and any
/// numeric `retry-after` header.
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: &str,
    request: reqwest::RequestBuilder,
) -> Result<T, ProviderError> {
    let response = request.send().await.map_err(transport_error)?;
    let status = response.status();

    if !status.is_success() {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();
        warn!(provider, status = status.as_u16(), body = %body, "Provider returned error");
        return Err(ProviderError::Http {
            status: status.as_u16(),
            body,
            retry_after_secs,
        });
    }

    let text = response.text().await.map_err(transport_error)?;
    serde_json::from_str(&text)
        .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))
}
