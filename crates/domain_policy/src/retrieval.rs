//! Retrieval collaborator port
//!
//! A document index holding declarations pages and policy form text. The
//! pipeline queries it with a metadata filter scoped to the claim's policy;
//! because an index may ignore the filter, every caller also drops snippets
//! tagged with a different policy number via [`scoped_snippets`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use core_kernel::{DomainPort, PolicyNumber, PortError};

/// Default number of snippets requested per query
pub const DEFAULT_TOP_K: usize = 3;

/// A query against the document index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalQuery {
    /// Natural-language query text
    pub text: String,
    /// Metadata filter; only snippets for this policy should be returned
    pub policy_number: Option<PolicyNumber>,
    /// Maximum number of snippets
    pub top_k: usize,
}

impl RetrievalQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            policy_number: None,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Restricts the query to one policy
    pub fn scoped_to(mut self, policy_number: &PolicyNumber) -> Self {
        self.policy_number = Some(policy_number.clone());
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Query used to locate a declarations page
    pub fn declarations_for(policy_number: &PolicyNumber) -> Self {
        Self::new(format!("declarations page for {}", policy_number))
            .scoped_to(policy_number)
            .with_top_k(1)
    }
}

/// A retrieved passage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySnippet {
    /// Stable identifier of the passage within the index
    pub id: String,
    /// Policy the passage belongs to; `None` for shared policy form text
    #[serde(default)]
    pub policy_number: Option<PolicyNumber>,
    pub text: String,
    #[serde(default)]
    pub score: Option<f32>,
}

impl PolicySnippet {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            policy_number: None,
            text: text.into(),
            score: None,
        }
    }

    pub fn for_policy(mut self, policy_number: &PolicyNumber) -> Self {
        self.policy_number = Some(policy_number.clone());
        self
    }

    /// True when the snippet belongs to another policy
    pub fn is_foreign_to(&self, policy_number: &PolicyNumber) -> bool {
        self.policy_number
            .as_ref()
            .map(|owner| owner != policy_number)
            .unwrap_or(false)
    }
}

/// Port for the retrieval collaborator
#[async_trait]
pub trait PolicyRetriever: DomainPort {
    /// Adapter name, recorded as the evidence source
    fn name(&self) -> &str;

    /// Runs a query; idempotent, so callers may retry transient failures
    async fn retrieve(&self, query: &RetrievalQuery) -> Result<Vec<PolicySnippet>, PortError>;
}

/// Discards snippets tagged with a policy number other than `policy_number`
pub fn scoped_snippets(
    policy_number: &PolicyNumber,
    snippets: Vec<PolicySnippet>,
) -> Vec<PolicySnippet> {
    let before = snippets.len();
    let kept: Vec<PolicySnippet> = snippets
        .into_iter()
        .filter(|snippet| !snippet.is_foreign_to(policy_number))
        .collect();
    if kept.len() < before {
        tracing::warn!(
            policy_number = %policy_number,
            discarded = before - kept.len(),
            "Discarded snippets belonging to other policies"
        );
    }
    kept
}
