//! Ports and Adapters Infrastructure
//!
//! Foundational types shared by every port the claim pipeline talks through:
//! the declarations store, the retrieval collaborator and the reasoning
//! collaborator. Each domain defines its own port trait extending
//! [`DomainPort`]; adapters (in-memory, directory, HTTP) implement it.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              Claim pipeline stages            │
//! └──────────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌──────────────────────────────────────────────┐
//! │  Port traits (DeclarationsPort, PolicyRetriever,
//! │               ReasoningClient)                │
//! └──────────────────────────────────────────────┘
//!            ▲                         ▲
//!   ┌────────┴────────┐      ┌─────────┴────────┐
//!   │ Local adapter   │      │ External adapter │
//!   │ (memory / dir)  │      │ (HTTP)           │
//!   └─────────────────┘      └──────────────────┘
//! ```

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for port operations
///
/// Provides a unified error type that all port implementations must use,
/// ensuring consistent error handling across local and external adapters.
#[derive(Debug, Error)]
pub enum PortError {
    /// The requested entity was not found
    #[error("Not found: {entity_type} with id {id}")]
    NotFound {
        entity_type: String,
        id: String,
    },

    /// Connection to the underlying system failed
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The operation timed out
    #[error("Timeout after {duration_ms}ms: {operation}")]
    Timeout {
        operation: String,
        duration_ms: u64,
    },

    /// Authentication or authorization failed
    #[error("Unauthorized: {message}")]
    Unauthorized {
        message: String,
    },

    /// Rate limit exceeded for external API
    #[error("Rate limited: retry after {retry_after_secs}s")]
    RateLimited {
        retry_after_secs: u64,
    },

    /// The external system is unavailable
    #[error("Service unavailable: {service}")]
    ServiceUnavailable {
        service: String,
    },

    /// A response could not be transformed into the expected shape
    #[error("Transformation error: {message}")]
    Transformation {
        message: String,
    },

    /// An internal error occurred
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl PortError {
    /// Creates a NotFound error
    pub fn not_found(entity_type: impl Into<String>, id: impl fmt::Display) -> Self {
        PortError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    /// Creates a Connection error
    pub fn connection(message: impl Into<String>) -> Self {
        PortError::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a Transformation error
    pub fn transformation(message: impl Into<String>) -> Self {
        PortError::Transformation {
            message: message.into(),
        }
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        PortError::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Returns true if this error indicates a transient failure that may succeed on retry
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PortError::Connection { .. }
                | PortError::Timeout { .. }
                | PortError::RateLimited { .. }
                | PortError::ServiceUnavailable { .. }
        )
    }

    /// Returns true if this error indicates the entity was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound { .. })
    }
}

/// Marker trait for all domain ports
///
/// All port traits extend this marker so they are thread-safe and usable
/// behind `Arc<dyn ...>` in async contexts.
pub trait DomainPort: Send + Sync + 'static {}

/// Retry policy for idempotent calls to external collaborators
///
/// The default allows a single retry, which is the most any collaborator
/// call in the pipeline is permitted before degrading to its fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt (transient failures only)
    pub max_retries: u32,
    /// Delay between attempts in milliseconds
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            backoff_ms: 250,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff_ms: 0,
        }
    }

    /// Runs `operation`, retrying transient failures up to `max_retries` times
    ///
    /// Non-transient errors are returned immediately.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, PortError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PortError>>,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        operation,
                        attempt,
                        error = %err,
                        "Transient collaborator failure, retrying"
                    );
                    if self.backoff_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(self.backoff_ms)).await;
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Connection settings for an external collaborator reached over HTTP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalServiceConfig {
    /// Base URL of the service (no trailing slash)
    pub base_url: String,
    /// Bearer credential, never serialized back out
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl ExternalServiceConfig {
    /// Creates a config with the default timeout and no credential
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            timeout_ms: default_timeout_ms(),
        }
    }

    /// Sets the bearer credential
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Returns the timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Health status for an adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterHealth {
    /// Adapter is healthy and operational
    Healthy,
    /// Adapter is unhealthy and not operational
    Unhealthy,
    /// Adapter is not configured; the pipeline runs on local fallbacks
    NotConfigured,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_port_error_transient() {
        let timeout = PortError::Timeout {
            operation: "chat".to_string(),
            duration_ms: 5000,
        };
        assert!(timeout.is_transient());
        assert!(!PortError::transformation("bad json").is_transient());
        assert!(PortError::not_found("Policy", "X").is_not_found());
    }

    #[tokio::test]
    async fn test_retry_policy_retries_once() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy { max_retries: 1, backoff_ms: 0 };

        let result: Result<(), PortError> = policy
            .run("probe", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(PortError::connection("down")) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_policy_skips_permanent_errors() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::default();

        let result: Result<(), PortError> = policy
            .run("probe", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(PortError::transformation("bad")) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_external_config_trims_trailing_slash() {
        let config = ExternalServiceConfig::new("https://llm.example.com/").with_api_key("k");
        assert_eq!(config.base_url, "https://llm.example.com");
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }
}
