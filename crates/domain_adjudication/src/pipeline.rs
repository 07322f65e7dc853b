//! Claim pipeline
//!
//! Loader, policy context resolver, the five agent stages in order, then the
//! decision formatter. Stages run one at a time; each sees every earlier
//! result through the accumulated [`PipelineState`].
//!
//! ```text
//! claim JSON -> ClaimLoader -> PolicyContextResolver
//!            -> FNOL -> Triage -> Fraud -> Coverage -> Settlement
//!            -> DecisionFormatter -> ClaimDecision
//! ```

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument};

use domain_claims::{ClaimLoader, ClaimRecord};
use domain_policy::PolicyContextResolver;

use crate::cancellation::CancellationToken;
use crate::config::PipelineConfig;
use crate::decision::{ClaimDecision, DecisionFormatter};
use crate::error::PipelineError;
use crate::executor::StageExecutor;
use crate::reasoning::ReasoningClient;
use crate::stage::AgentStage;
use crate::stages::{CoverageStage, FnolStage, FraudStage, SettlementStage, TriageStage};
use crate::state::PipelineState;

/// Runs claims through the adjudication stages
///
/// Holds no per-claim state, so one pipeline can serve concurrent claims
/// behind an `Arc`.
pub struct ClaimPipeline {
    resolver: PolicyContextResolver,
    config: PipelineConfig,
    executor: StageExecutor,
    stages: Vec<Box<dyn AgentStage>>,
}

impl ClaimPipeline {
    /// Builds a pipeline whose stages all run on their deterministic rules
    ///
    /// The coverage stage uses the resolver's retrieval collaborator, if it
    /// has one.
    pub fn new(resolver: PolicyContextResolver, config: PipelineConfig) -> Self {
        let stages = Self::build_stages(&resolver, &config);
        Self {
            executor: StageExecutor::new(None, config.retry),
            resolver,
            config,
            stages,
        }
    }

    /// Backs every stage with `client`
    pub fn with_reasoning_client(mut self, client: Arc<dyn ReasoningClient>) -> Self {
        self.executor = StageExecutor::new(Some(client), self.config.retry);
        self
    }

    fn build_stages(resolver: &PolicyContextResolver, config: &PipelineConfig) -> Vec<Box<dyn AgentStage>> {
        vec![
            Box::new(FnolStage::new(config.clone())),
            Box::new(TriageStage::new(config.clone())),
            Box::new(FraudStage::new(config.clone())),
            Box::new(CoverageStage::new(config.clone()).with_retriever(resolver.retriever().cloned())),
            Box::new(SettlementStage::new(config.clone())),
        ]
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn resolver(&self) -> &PolicyContextResolver {
        &self.resolver
    }

    pub fn reasoning_collaborator(&self) -> Option<&str> {
        self.executor.client_name()
    }

    pub async fn process_json(&self, json: &str) -> Result<ClaimDecision, PipelineError> {
        let claim = ClaimLoader::from_json_str(json)?;
        self.process_record(claim).await
    }

    pub async fn process_value(&self, value: Value) -> Result<ClaimDecision, PipelineError> {
        let claim = ClaimLoader::from_value(value)?;
        self.process_record(claim).await
    }

    pub async fn process_path(&self, path: impl AsRef<Path>) -> Result<ClaimDecision, PipelineError> {
        let claim = ClaimLoader::from_path(path)?;
        self.process_record(claim).await
    }

    pub async fn process_record(&self, claim: ClaimRecord) -> Result<ClaimDecision, PipelineError> {
        self.process_with_cancellation(claim, &CancellationToken::new()).await
    }

    /// Runs one claim to a decision
    ///
    /// `cancel` is checked before policy resolution, before every stage and
    /// before formatting, and it interrupts in-flight collaborator calls. A
    /// cancelled run never yields a partial decision.
    ///
    /// # Errors
    ///
    /// `PolicyNotFound` when no declarations exist for the claim's policy,
    /// `Cancelled` when `cancel` fires before the decision is formatted.
    #[instrument(
        name = "claim_pipeline",
        skip(self, claim, cancel),
        fields(claim_number = %claim.claim_number, policy_number = %claim.policy_number)
    )]
    pub async fn process_with_cancellation(
        &self,
        claim: ClaimRecord,
        cancel: &CancellationToken,
    ) -> Result<ClaimDecision, PipelineError> {
        if cancel.is_cancelled() {
            return Err(PipelineError::cancelled("policy resolution"));
        }
        let context = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::cancelled("policy resolution")),
            context = self.resolver.resolve(&claim.policy_number) => context?,
        };
        info!(source = ?context.source, "Policy context resolved");

        let mut state = PipelineState::new(claim, context);
        for stage in &self.stages {
            if cancel.is_cancelled() {
                return Err(PipelineError::cancelled(stage.name().as_str()));
            }
            if state.next_stage() != Some(stage.name()) {
                return Err(PipelineError::incomplete(format!(
                    "{} would run out of order",
                    stage.name()
                )));
            }
            let result = self.executor.execute(stage.as_ref(), &state, cancel).await?;
            info!(stage = %result.stage, source = %result.source, "Stage complete");
            state = state.with_result(result);
        }

        if cancel.is_cancelled() {
            return Err(PipelineError::cancelled("decision formatting"));
        }
        let (claim, context, results) = state.into_parts();
        let decision = DecisionFormatter::format(claim, &context, results)?;
        info!(
            decision_id = %decision.decision_id,
            determination = %decision.determination,
            payout = %decision.recommended_payout,
            review_required = decision.review_required,
            "Claim decided"
        );
        Ok(decision)
    }
}

impl std::fmt::Debug for ClaimPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaimPipeline")
            .field("executor", &self.executor)
            .field("stages", &self.stages.iter().map(|s| s.name()).collect::<Vec<_>>())
            .finish()
    }
}
