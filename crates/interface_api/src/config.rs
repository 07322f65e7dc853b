//! Application configuration
//!
//! Loaded from `CLAIMS_`-prefixed environment variables, with `__`
//! separating nested keys:
//!
//! ```bash
//! CLAIMS_PORT=8080
//! CLAIMS_DECLARATIONS_DIR=data/declarations
//! CLAIMS_REASONING__BASE_URL=https://llm.example.com
//! CLAIMS_REASONING__MODEL=gpt-4o-mini
//! CLAIMS_RETRIEVAL__BASE_URL=http://localhost:7700
//! CLAIMS_PIPELINE__FRAUD_REVIEW_THRESHOLD=0.5
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use core_kernel::ExternalServiceConfig;
use domain_adjudication::PipelineConfig;

const ENV_PREFIX: &str = "CLAIMS";

/// Reasoning collaborator settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReasoningSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_ms: u64,
}

impl Default for ReasoningSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            timeout_ms: 30_000,
        }
    }
}

impl ReasoningSettings {
    pub fn service_config(&self) -> ExternalServiceConfig {
        service_config(&self.base_url, self.api_key.as_deref(), self.timeout_ms)
    }
}

/// Retrieval collaborator settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_ms: u64,
    /// Overrides `pipeline.retrieval_top_k` when set
    pub top_k: Option<usize>,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: None,
            timeout_ms: 10_000,
            top_k: None,
        }
    }
}

impl RetrievalSettings {
    pub fn service_config(&self) -> ExternalServiceConfig {
        service_config(&self.base_url, self.api_key.as_deref(), self.timeout_ms)
    }
}

fn service_config(base_url: &str, api_key: Option<&str>, timeout_ms: u64) -> ExternalServiceConfig {
    let mut config = ExternalServiceConfig::new(base_url);
    if let Some(key) = api_key.filter(|k| !k.is_empty()) {
        config = config.with_api_key(key);
    }
    config.timeout_ms = timeout_ms;
    config
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Log level: trace, debug, info, warn, error
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text
    pub log_json: bool,
    /// Directory of declarations documents
    pub declarations_dir: PathBuf,
    /// Deadline for one decision request; the pipeline is cancelled past it
    pub request_timeout_ms: u64,
    pub reasoning: Option<ReasoningSettings>,
    pub retrieval: Option<RetrievalSettings>,
    pub pipeline: PipelineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            log_json: false,
            declarations_dir: PathBuf::from("data/declarations"),
            request_timeout_ms: 60_000,
            reasoning: None,
            retrieval: None,
            pipeline: PipelineConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from the process environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::load(None)
    }

    /// Loads configuration from an explicit variable map instead of the
    /// process environment
    pub fn from_map(vars: HashMap<String, String>) -> Result<Self, config::ConfigError> {
        Self::load(Some(vars))
    }

    fn load(vars: Option<HashMap<String, String>>) -> Result<Self, config::ConfigError> {
        let mut config: AppConfig = config::Config::builder()
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(vars),
            )
            .build()?
            .try_deserialize()?;

        if let Some(top_k) = config.retrieval.as_ref().and_then(|r| r.top_k) {
            config.pipeline.retrieval_top_k = top_k;
        }
        // A section with no URL counts as not configured
        config.reasoning = config.reasoning.filter(|r| !r.base_url.trim().is_empty());
        config.retrieval = config.retrieval.filter(|r| !r.base_url.trim().is_empty());
        Ok(config)
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_without_variables() {
        let config = AppConfig::from_map(HashMap::new()).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.server_addr(), "0.0.0.0:8080");
        assert!(config.reasoning.is_none());
    }

    #[test]
    fn test_top_level_and_nested_keys() {
        let config = AppConfig::from_map(vars(&[
            ("CLAIMS_PORT", "9090"),
            ("CLAIMS_LOG_JSON", "true"),
            ("CLAIMS_DECLARATIONS_DIR", "/srv/declarations"),
            ("CLAIMS_REASONING__BASE_URL", "https://llm.example.com/"),
            ("CLAIMS_REASONING__API_KEY", "secret"),
            ("CLAIMS_PIPELINE__FRAUD_REVIEW_THRESHOLD", "0.7"),
        ]))
        .unwrap();

        assert_eq!(config.port, 9090);
        assert!(config.log_json);
        assert_eq!(config.declarations_dir, PathBuf::from("/srv/declarations"));
        assert_eq!(config.pipeline.fraud_review_threshold, dec!(0.7));
        assert_eq!(config.pipeline.late_reporting_days, 30);

        let reasoning = config.reasoning.unwrap();
        assert_eq!(reasoning.model, "gpt-4o-mini");
        let service = reasoning.service_config();
        assert_eq!(service.base_url, "https://llm.example.com");
        assert_eq!(service.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_retrieval_top_k_overrides_pipeline() {
        let config = AppConfig::from_map(vars(&[
            ("CLAIMS_RETRIEVAL__BASE_URL", "http://localhost:7700"),
            ("CLAIMS_RETRIEVAL__TOP_K", "5"),
        ]))
        .unwrap();
        assert_eq!(config.pipeline.retrieval_top_k, 5);
        assert!(config.retrieval.unwrap().service_config().api_key.is_none());
    }

    #[test]
    fn test_section_without_url_is_not_configured() {
        let config = AppConfig::from_map(vars(&[("CLAIMS_REASONING__MODEL", "local")])).unwrap();
        assert!(config.reasoning.is_none());
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        assert!(AppConfig::from_map(vars(&[("CLAIMS_PORT", "not-a-port")])).is_err());
    }
}
