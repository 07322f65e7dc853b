//! Scripted reasoning collaborator
//!
//! Replies are queued per stage and served in order. A stage with nothing
//! queued gets a non-transient error, so an unscripted stage falls back
//! without a retry.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use core_kernel::{DomainPort, PortError};

use crate::reasoning::{ReasoningClient, ReasoningRequest, ReasoningResponse};
use crate::stage::StageName;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// Answer text, returned as the response content
    Content(String),
    /// A transient failure
    Unavailable,
    /// Never answers; only cancellation ends the call
    Hang,
}

impl MockReply {
    pub fn content(content: impl Into<String>) -> Self {
        MockReply::Content(content.into())
    }

    pub fn json(value: serde_json::Value) -> Self {
        MockReply::Content(value.to_string())
    }
}

pub struct MockReasoningClient {
    name: String,
    replies: Mutex<HashMap<StageName, VecDeque<MockReply>>>,
    requests: Mutex<Vec<ReasoningRequest>>,
}

impl MockReasoningClient {
    pub fn new() -> Self {
        Self::with_name("mock-reasoner")
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            replies: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_reply(self, stage: StageName, reply: MockReply) -> Self {
        self.add_reply(stage, reply);
        self
    }

    pub fn add_reply(&self, stage: StageName, reply: MockReply) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(stage)
            .or_default()
            .push_back(reply);
    }

    /// Every request received, in order
    pub fn requests(&self) -> Vec<ReasoningRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn requests_for(&self, stage: StageName) -> Vec<ReasoningRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.stage == stage)
            .collect()
    }

    pub fn remaining_replies(&self) -> usize {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(VecDeque::len)
            .sum()
    }
}

impl Default for MockReasoningClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DomainPort for MockReasoningClient {}

#[async_trait]
impl ReasoningClient for MockReasoningClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &ReasoningRequest) -> Result<ReasoningResponse, PortError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let reply = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&request.stage)
            .and_then(VecDeque::pop_front);

        match reply {
            Some(MockReply::Content(content)) => Ok(ReasoningResponse {
                content,
                model: Some(self.name.clone()),
            }),
            Some(MockReply::Unavailable) => Err(PortError::ServiceUnavailable {
                service: self.name.clone(),
            }),
            Some(MockReply::Hang) => std::future::pending().await,
            None => Err(PortError::internal(format!(
                "{}: no reply scripted for {}",
                self.name, request.stage
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(stage: StageName) -> ReasoningRequest {
        ReasoningRequest::new(stage, "test", json!({}))
    }

    #[tokio::test]
    async fn test_replies_are_per_stage() {
        let client = MockReasoningClient::new()
            .with_reply(StageName::FraudRadar, MockReply::content("{}"))
            .with_reply(StageName::FraudRadar, MockReply::Unavailable);

        assert!(client.complete(&request(StageName::SmartTriage)).await.is_err());
        assert_eq!(
            client.complete(&request(StageName::FraudRadar)).await.unwrap().content,
            "{}"
        );
        let err = client.complete(&request(StageName::FraudRadar)).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(client.requests().len(), 3);
        assert_eq!(client.remaining_replies(), 0);
    }

    #[tokio::test]
    async fn test_unscripted_is_not_transient() {
        let client = MockReasoningClient::new();
        let err = client.complete(&request(StageName::FnolIntelligence)).await.unwrap_err();
        assert!(!err.is_transient());
    }
}
