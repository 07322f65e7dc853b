//! Stage execution
//!
//! Runs one [`AgentStage`] against the accumulated state. With a reasoning
//! collaborator configured the stage's request is sent (one retry of a
//! transient failure) and the answer interpreted; any failure, or no
//! collaborator at all, completes the stage on its deterministic fallback.

use std::sync::Arc;

use tracing::{debug, warn};

use core_kernel::{PortError, RetryPolicy};

use crate::cancellation::CancellationToken;
use crate::error::PipelineError;
use crate::reasoning::ReasoningClient;
use crate::stage::{AgentStage, FallbackReason, StageFailure, StageInput, StageResult, StageSource, StageVerdict};
use crate::state::PipelineState;

#[derive(Clone)]
pub struct StageExecutor {
    client: Option<Arc<dyn ReasoningClient>>,
    retry: RetryPolicy,
}

impl StageExecutor {
    pub fn new(client: Option<Arc<dyn ReasoningClient>>, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// Executor that always takes the fallback path
    pub fn deterministic() -> Self {
        Self::new(None, RetryPolicy::none())
    }

    pub fn client_name(&self) -> Option<&str> {
        self.client.as_deref().map(|c| c.name())
    }

    /// Produces exactly one result for `stage`
    ///
    /// # Errors
    ///
    /// Only `PipelineError::Cancelled`, when `cancel` fires while the stage
    /// is gathering evidence or waiting on the collaborator.
    pub async fn execute(
        &self,
        stage: &dyn AgentStage,
        state: &PipelineState,
        cancel: &CancellationToken,
    ) -> Result<StageResult, PipelineError> {
        let name = stage.name();

        let evidence = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::cancelled(name.as_str())),
            evidence = stage.gather_evidence(state) => evidence,
        };
        let input = StageInput {
            state,
            evidence: &evidence,
        };

        let Some(client) = self.client.as_ref() else {
            debug!(stage = %name, "No reasoning collaborator configured");
            return Ok(Self::fallback(stage, input, FallbackReason::NotConfigured, None));
        };

        let request = stage.compose_request(input);
        let call = self.retry.run(name.as_str(), || client.complete(&request));
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::cancelled(name.as_str())),
            response = call => response,
        };

        let verdict = response
            .map_err(unusable_response)
            .and_then(|response| stage.interpret(input, &response.content))
            .and_then(|verdict| {
                if verdict.outcome.stage() == name {
                    Ok(verdict)
                } else {
                    Err(StageFailure::schema(format!(
                        "answer produced a {} outcome",
                        verdict.outcome.stage()
                    )))
                }
            });

        match verdict {
            Ok(verdict) => {
                debug!(stage = %name, collaborator = client.name(), "Stage answered by collaborator");
                Ok(StageResult {
                    stage: name,
                    rationale: verdict.rationale,
                    outcome: verdict.outcome,
                    source: StageSource::Collaborator {
                        name: client.name().to_string(),
                    },
                })
            }
            Err(failure) => {
                warn!(
                    stage = %name,
                    collaborator = client.name(),
                    reason = %failure.reason(),
                    error = %failure,
                    "Collaborator answer unusable, using fallback"
                );
                Ok(Self::fallback(stage, input, failure.reason(), Some(&failure)))
            }
        }
    }

    fn fallback(
        stage: &dyn AgentStage,
        input: StageInput<'_>,
        reason: FallbackReason,
        failure: Option<&StageFailure>,
    ) -> StageResult {
        let StageVerdict { outcome, rationale } = stage.fallback(input);
        let note = match failure {
            Some(failure) => format!("[fallback: {}: {}]", reason, failure_detail(failure)),
            None => format!("[fallback: {}]", reason),
        };
        StageResult {
            stage: stage.name(),
            rationale: format!("{} {}", rationale, note),
            outcome,
            source: StageSource::Fallback { reason },
        }
    }
}

impl std::fmt::Debug for StageExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageExecutor")
            .field("client", &self.client_name())
            .field("retry", &self.retry)
            .finish()
    }
}

/// A malformed response body is a schema problem; everything else means the
/// collaborator could not be reached
fn unusable_response(err: PortError) -> StageFailure {
    match err {
        PortError::Transformation { message } => StageFailure::SchemaMismatch(message),
        other => StageFailure::CollaboratorUnavailable(other.to_string()),
    }
}

fn failure_detail(failure: &StageFailure) -> &str {
    match failure {
        StageFailure::CollaboratorUnavailable(detail) | StageFailure::SchemaMismatch(detail) => detail,
    }
}
