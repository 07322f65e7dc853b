//! OpenAI-compatible reasoning collaborator
//!
//! Sends each stage request as a two-message chat completion: the stage
//! instructions as the system message and the least-privilege context as a
//! JSON user message. JSON output is requested through `response_format`.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use core_kernel::{AdapterHealth, DomainPort, ExternalServiceConfig, PortError};
use domain_adjudication::{ReasoningClient, ReasoningRequest, ReasoningResponse};

use crate::http::{authorize, build_client, send_json};

const SERVICE: &str = "reasoning collaborator";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

/// Reasoning collaborator reached through `POST {base_url}/v1/chat/completions`
pub struct OpenAiCompatibleClient {
    config: ExternalServiceConfig,
    model: String,
    name: String,
    http: Client,
}

impl OpenAiCompatibleClient {
    /// # Errors
    ///
    /// `PortError::Internal` if the HTTP client cannot be built.
    pub fn new(config: ExternalServiceConfig, model: impl Into<String>) -> Result<Self, PortError> {
        let model = model.into();
        Ok(Self {
            http: build_client(&config)?,
            name: format!("openai-compatible/{}", model),
            config,
            model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Probes `GET {base_url}/v1/models`
    pub async fn health(&self) -> AdapterHealth {
        let url = format!("{}/v1/models", self.config.base_url);
        match authorize(self.http.get(&url), &self.config).send().await {
            Ok(response) if response.status().is_success() => AdapterHealth::Healthy,
            Ok(response) => {
                debug!(status = response.status().as_u16(), "Reasoning health probe failed");
                AdapterHealth::Unhealthy
            }
            Err(e) => {
                debug!(error = %e, "Reasoning health probe failed");
                AdapterHealth::Unhealthy
            }
        }
    }
}

impl std::fmt::Debug for OpenAiCompatibleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleClient")
            .field("base_url", &self.config.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl DomainPort for OpenAiCompatibleClient {}

#[async_trait]
impl ReasoningClient for OpenAiCompatibleClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &ReasoningRequest) -> Result<ReasoningResponse, PortError> {
        let url = format!("{}/v1/chat/completions", self.config.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: request.instructions.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.context.to_string(),
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: ResponseFormat { kind: "json_object" },
        };

        let start = Instant::now();
        let response: ChatResponse = send_json(
            authorize(self.http.post(&url), &self.config).json(&body),
            request.stage.as_str(),
            SERVICE,
            &self.config,
        )
        .await?;

        if let Some(usage) = &response.usage {
            debug!(
                stage = %request.stage,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Reasoning usage"
            );
        }

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| PortError::transformation("no content in chat completion response"))?;

        info!(
            stage = %request.stage,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Reasoning collaborator answered"
        );
        Ok(ReasoningResponse {
            content,
            model: response.model,
        })
    }
}
