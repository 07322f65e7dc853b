//! Shared HTTP plumbing for collaborator adapters
//!
//! Responses are mapped onto [`PortError`] so the retry policy can tell
//! transient failures from permanent ones:
//! - 404 -> `PortError::NotFound`
//! - 401/403 -> `PortError::Unauthorized`
//! - 429 -> `PortError::RateLimited`
//! - 5xx -> `PortError::ServiceUnavailable`
//! - Timeouts -> `PortError::Timeout`
//! - Connect failures -> `PortError::Connection`
//! - Other -> `PortError::Internal`

use reqwest::header::RETRY_AFTER;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use core_kernel::{ExternalServiceConfig, PortError};

const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

/// Builds a pooled client honouring the configured timeout
pub(crate) fn build_client(config: &ExternalServiceConfig) -> Result<Client, PortError> {
    Client::builder()
        .timeout(config.timeout())
        .build()
        .map_err(|e| PortError::Internal {
            message: "failed to build HTTP client".to_string(),
            source: Some(Box::new(e)),
        })
}

/// Adds the bearer credential when one is configured
pub(crate) fn authorize(request: RequestBuilder, config: &ExternalServiceConfig) -> RequestBuilder {
    match &config.api_key {
        Some(key) => request.bearer_auth(key),
        None => request,
    }
}

pub(crate) fn transport_error(err: reqwest::Error, operation: &str, config: &ExternalServiceConfig) -> PortError {
    if err.is_timeout() {
        PortError::Timeout {
            operation: operation.to_string(),
            duration_ms: config.timeout_ms,
        }
    } else if err.is_connect() {
        PortError::Connection {
            message: format!("cannot connect to {}", config.base_url),
            source: Some(Box::new(err)),
        }
    } else {
        PortError::Internal {
            message: format!("{} request failed", operation),
            source: Some(Box::new(err)),
        }
    }
}

/// Maps a non-success status to a port error
pub(crate) async fn status_error(response: Response, service: &str) -> PortError {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();
    warn!(service, status = status.as_u16(), body = %body, "Collaborator returned error status");

    match status {
        StatusCode::NOT_FOUND => PortError::not_found(service, status),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PortError::Unauthorized {
            message: format!("{} rejected the credential ({})", service, status),
        },
        StatusCode::TOO_MANY_REQUESTS => PortError::RateLimited {
            retry_after_secs: retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        },
        s if s.is_server_error() => PortError::ServiceUnavailable {
            service: format!("{} ({})", service, status),
        },
        _ => PortError::internal(format!("{} returned {}: {}", service, status, body)),
    }
}

/// Sends `request` and decodes a JSON body
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    operation: &str,
    service: &str,
    config: &ExternalServiceConfig,
) -> Result<T, PortError> {
    let response = request
        .send()
        .await
        .map_err(|e| transport_error(e, operation, config))?;

    if !response.status().is_success() {
        return Err(status_error(response, service).await);
    }
    debug!(service, status = response.status().as_u16(), "Collaborator responded");

    response
        .json::<T>()
        .await
        .map_err(|e| PortError::transformation(format!("{} response: {}", service, e)))
}
