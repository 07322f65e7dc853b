//! Scripted retrieval collaborator
//!
//! `StaticRetriever` serves a fixed set of snippets ranked by word overlap
//! with the query. It ignores the policy filter on purpose, the way a
//! misconfigured index would, so callers' own scoping is exercised.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use core_kernel::{DomainPort, PortError};

use crate::retrieval::{PolicyRetriever, PolicySnippet, RetrievalQuery};

pub struct StaticRetriever {
    name: String,
    snippets: Vec<PolicySnippet>,
    failures_remaining: AtomicUsize,
    calls: AtomicUsize,
    queries: Mutex<Vec<RetrievalQuery>>,
}

impl StaticRetriever {
    pub fn new() -> Self {
        Self::with_name("static-index")
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            snippets: Vec::new(),
            failures_remaining: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn with_snippet(mut self, snippet: PolicySnippet) -> Self {
        self.snippets.push(snippet);
        self
    }

    pub fn with_snippets(mut self, snippets: impl IntoIterator<Item = PolicySnippet>) -> Self {
        self.snippets.extend(snippets);
        self
    }

    /// Fails the next `count` calls with a transient error
    pub fn failing_first(self, count: usize) -> Self {
        self.failures_remaining.store(count, Ordering::SeqCst);
        self
    }

    /// Fails every call with a transient error
    pub fn unavailable(self) -> Self {
        self.failing_first(usize::MAX)
    }

    /// Number of `retrieve` calls made, failed ones included
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Queries received so far
    pub fn queries(&self) -> Vec<RetrievalQuery> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn overlap(query: &str, text: &str) -> usize {
        let text = text.to_ascii_lowercase();
        query
            .to_ascii_lowercase()
            .split_whitespace()
            .filter(|word| word.len() > 2 && text.contains(*word))
            .count()
    }
}

impl Default for StaticRetriever {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StaticRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticRetriever")
            .field("name", &self.name)
            .field("snippets", &self.snippets.len())
            .field("calls", &self.calls())
            .finish()
    }
}

impl DomainPort for StaticRetriever {}

#[async_trait]
impl PolicyRetriever for StaticRetriever {
    fn name(&self) -> &str {
        &self.name
    }

    async fn retrieve(&self, query: &RetrievalQuery) -> Result<Vec<PolicySnippet>, PortError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(query.clone());

        let failing = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(PortError::ServiceUnavailable {
                service: self.name.clone(),
            });
        }

        let mut ranked: Vec<(usize, &PolicySnippet)> = self
            .snippets
            .iter()
            .map(|snippet| (Self::overlap(&query.text, &snippet.text), snippet))
            .collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(ranked
            .into_iter()
            .take(query.top_k)
            .map(|(_, snippet)| snippet.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ranks_by_overlap_and_truncates() {
        let retriever = StaticRetriever::new()
            .with_snippet(PolicySnippet::new("form", "PART D - COLLISION COVERAGE"))
            .with_snippet(PolicySnippet::new("ded", "Deductible for collision coverage: $500"));

        let snippets = retriever
            .retrieve(&RetrievalQuery::new("collision deductible").with_top_k(1))
            .await
            .unwrap();
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].id, "ded");
        assert_eq!(retriever.calls(), 1);
    }

    #[tokio::test]
    async fn test_scripted_failures() {
        let retriever = StaticRetriever::new().failing_first(1);
        let query = RetrievalQuery::new("anything");
        assert!(retriever.retrieve(&query).await.unwrap_err().is_transient());
        assert!(retriever.retrieve(&query).await.is_ok());
        assert_eq!(retriever.queries().len(), 2);
    }
}
