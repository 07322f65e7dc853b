//! Document-index retrieval collaborator
//!
//! `POST {base_url}/retrieve` with `{query, top_k, filters: {policy_number}}`.
//! The index is trusted to apply the filter but not relied on: callers still
//! drop foreign snippets.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use core_kernel::{DomainPort, ExternalServiceConfig, PolicyNumber, PortError};
use domain_policy::{PolicyRetriever, PolicySnippet, RetrievalQuery};

use crate::http::{authorize, build_client, send_json};

const SERVICE: &str = "retrieval collaborator";

#[derive(Debug, Serialize)]
struct RetrieveRequest<'a> {
    query: &'a str,
    top_k: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    filters: Option<Filters<'a>>,
}

#[derive(Debug, Serialize)]
struct Filters<'a> {
    policy_number: &'a str,
}

#[derive(Debug, Deserialize)]
struct RetrieveResponse {
    #[serde(default)]
    results: Vec<RetrievedDocument>,
}

#[derive(Debug, Deserialize)]
struct RetrievedDocument {
    id: String,
    text: String,
    #[serde(default)]
    score: Option<f32>,
    #[serde(default)]
    policy_number: Option<String>,
    #[serde(default)]
    metadata: Option<Value>,
}

impl RetrievedDocument {
    fn into_snippet(self) -> PolicySnippet {
        let owner = self.policy_number.or_else(|| {
            self.metadata
                .as_ref()
                .and_then(|m| m.get("policy_number"))
                .and_then(Value::as_str)
                .map(str::to_string)
        });
        PolicySnippet {
            id: self.id,
            // A blank tag is treated as shared form text
            policy_number: owner.and_then(|p| PolicyNumber::new(p).ok()),
            text: self.text,
            score: self.score,
        }
    }
}

/// Retrieval collaborator over HTTP
pub struct HttpRetrievalClient {
    config: ExternalServiceConfig,
    name: String,
    http: Client,
}

impl HttpRetrievalClient {
    /// # Errors
    ///
    /// `PortError::Internal` if the HTTP client cannot be built.
    pub fn new(config: ExternalServiceConfig) -> Result<Self, PortError> {
        Ok(Self {
            http: build_client(&config)?,
            name: "document-index".to_string(),
            config,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl std::fmt::Debug for HttpRetrievalClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRetrievalClient")
            .field("name", &self.name)
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

impl DomainPort for HttpRetrievalClient {}

#[async_trait]
impl PolicyRetriever for HttpRetrievalClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn retrieve(&self, query: &RetrievalQuery) -> Result<Vec<PolicySnippet>, PortError> {
        let url = format!("{}/retrieve", self.config.base_url);
        let body = RetrieveRequest {
            query: &query.text,
            top_k: query.top_k,
            filters: query.policy_number.as_ref().map(|p| Filters {
                policy_number: p.as_str(),
            }),
        };

        let response: RetrieveResponse = send_json(
            authorize(self.http.post(&url), &self.config).json(&body),
            "retrieve",
            SERVICE,
            &self.config,
        )
        .await?;

        debug!(
            query = %query.text,
            results = response.results.len(),
            "Retrieval collaborator answered"
        );
        Ok(response
            .results
            .into_iter()
            .take(query.top_k)
            .map(RetrievedDocument::into_snippet)
            .collect())
    }
}
