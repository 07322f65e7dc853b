//! Policy Context Resolver
//!
//! Finds the declarations governing a claim. The retrieval collaborator is
//! consulted first when one is configured; the local store is the fallback.
//! Snippets that belong to another policy are never used.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use core_kernel::{PolicyNumber, RetryPolicy};

use crate::declarations::PolicyDeclarations;
use crate::error::PolicyError;
use crate::parser::DeclarationsParser;
use crate::retrieval::{scoped_snippets, PolicyRetriever, RetrievalQuery};
use crate::store::DeclarationsPort;

/// Where the declarations for a claim came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeclarationsSource {
    /// Parsed from a snippet returned by the retrieval collaborator
    Retrieval { collaborator: String, snippet_id: String },
    /// Read from the local declarations store
    Local,
}

/// The declarations resolved for a claim and their provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyContext {
    pub declarations: PolicyDeclarations,
    pub source: DeclarationsSource,
}

/// Resolves a policy number to its declarations
#[derive(Clone)]
pub struct PolicyContextResolver {
    local: Arc<dyn DeclarationsPort>,
    retriever: Option<Arc<dyn PolicyRetriever>>,
    retry: RetryPolicy,
}

impl PolicyContextResolver {
    pub fn new(local: Arc<dyn DeclarationsPort>) -> Self {
        Self {
            local,
            retriever: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retriever(mut self, retriever: Arc<dyn PolicyRetriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The configured retrieval collaborator, if any
    pub fn retriever(&self) -> Option<&Arc<dyn PolicyRetriever>> {
        self.retriever.as_ref()
    }

    /// The local declarations store
    pub fn local_store(&self) -> &Arc<dyn DeclarationsPort> {
        &self.local
    }

    /// Resolves the declarations for `policy_number`
    ///
    /// # Errors
    ///
    /// `PolicyNotFound` when neither the collaborator nor the local store
    /// has declarations for the policy; `Port` when the local store fails.
    #[instrument(skip(self), fields(policy_number = %policy_number))]
    pub async fn resolve(&self, policy_number: &PolicyNumber) -> Result<PolicyContext, PolicyError> {
        if let Some(context) = self.from_retrieval(policy_number).await {
            return Ok(context);
        }

        match self.local.find(policy_number).await? {
            Some(declarations) => {
                info!("Declarations resolved from local store");
                Ok(PolicyContext {
                    declarations,
                    source: DeclarationsSource::Local,
                })
            }
            None => {
                warn!("No declarations found for policy");
                Err(PolicyError::not_found(policy_number))
            }
        }
    }

    async fn from_retrieval(&self, policy_number: &PolicyNumber) -> Option<PolicyContext> {
        let retriever = self.retriever.as_ref()?;
        let query = RetrievalQuery::declarations_for(policy_number);

        let snippets = match self
            .retry
            .run("retrieve declarations", || retriever.retrieve(&query))
            .await
        {
            Ok(snippets) => snippets,
            Err(e) => {
                warn!(
                    collaborator = retriever.name(),
                    error = %e,
                    "Declarations retrieval failed, using local store"
                );
                return None;
            }
        };

        for snippet in scoped_snippets(policy_number, snippets) {
            match DeclarationsParser::parse(&snippet.text) {
                Ok(declarations) if declarations.policy_number == *policy_number => {
                    info!(
                        collaborator = retriever.name(),
                        snippet_id = %snippet.id,
                        "Declarations resolved from retrieval"
                    );
                    return Some(PolicyContext {
                        declarations,
                        source: DeclarationsSource::Retrieval {
                            collaborator: retriever.name().to_string(),
                            snippet_id: snippet.id,
                        },
                    });
                }
                Ok(declarations) => {
                    warn!(
                        snippet_id = %snippet.id,
                        found = %declarations.policy_number,
                        "Discarded declarations for another policy"
                    );
                }
                Err(e) => {
                    debug!(snippet_id = %snippet.id, error = %e, "Snippet is not a declarations page");
                }
            }
        }

        None
    }
}

impl std::fmt::Debug for PolicyContextResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyContextResolver")
            .field("retriever", &self.retriever.as_ref().map(|r| r.name().to_string()))
            .field("retry", &self.retry)
            .finish()
    }
}
