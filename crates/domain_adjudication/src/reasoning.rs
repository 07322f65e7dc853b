//! Reasoning collaborator port
//!
//! Any service that accepts instructions plus a JSON context and answers with
//! text convertible to a stage schema can back the agent stages. Requests
//! carry only the fields a stage needs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use core_kernel::{DomainPort, PortError};

use crate::stage::StageName;

/// A request from one stage to the reasoning collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningRequest {
    pub stage: StageName,
    /// Task instructions, including the expected JSON shape
    pub instructions: String,
    /// Least-privilege context for the stage
    pub context: serde_json::Value,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ReasoningRequest {
    pub fn new(stage: StageName, instructions: impl Into<String>, context: serde_json::Value) -> Self {
        Self {
            stage,
            instructions: instructions.into(),
            context,
            max_tokens: 800,
            temperature: 0.1,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Raw answer from the reasoning collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasoningResponse {
    pub content: String,
    #[serde(default)]
    pub model: Option<String>,
}

impl ReasoningResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: None,
        }
    }
}

/// Port for the reasoning collaborator
#[async_trait]
pub trait ReasoningClient: DomainPort {
    /// Collaborator name, recorded in each stage result it backs
    fn name(&self) -> &str;

    async fn complete(&self, request: &ReasoningRequest) -> Result<ReasoningResponse, PortError>;
}

/// Strips a markdown code fence from a model answer, if present
pub fn extract_json(content: &str) -> &str {
    let trimmed = content.trim();

    if let Some(start) = trimmed.find("```json") {
        let after_fence = &trimmed[start + 7..];
        if let Some(end) = after_fence.find("```") {
            return after_fence[..end].trim();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        if let Some(end) = after_fence.find("```") {
            return after_fence[..end].trim();
        }
    }

    trimmed
}
