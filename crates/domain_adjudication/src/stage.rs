//! Agent stage contract
//!
//! Every stage has the same shape: it reads the accumulated
//! [`PipelineState`], optionally asks the reasoning collaborator, and always
//! produces exactly one [`StageResult`]. The collaborator-backed path and the
//! deterministic fallback sit behind the one [`AgentStage`] trait; the
//! [`crate::executor::StageExecutor`] decides which path runs.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use domain_policy::PolicySnippet;

use crate::reasoning::ReasoningRequest;
use crate::stages::coverage::CoverageAssessment;
use crate::stages::fnol::FnolAssessment;
use crate::stages::fraud::FraudAssessment;
use crate::stages::settlement::SettlementRecommendation;
use crate::stages::triage::TriageAssessment;
use crate::state::PipelineState;

/// The five agent stages, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StageName {
    #[serde(rename = "fnol_intelligence")]
    FnolIntelligence,
    #[serde(rename = "smart_triage")]
    SmartTriage,
    #[serde(rename = "fraud_radar")]
    FraudRadar,
    #[serde(rename = "coverage_policy_query")]
    CoveragePolicyQuery,
    #[serde(rename = "settlement_recommendation")]
    SettlementRecommendation,
}

impl StageName {
    pub const ORDER: [StageName; 5] = [
        StageName::FnolIntelligence,
        StageName::SmartTriage,
        StageName::FraudRadar,
        StageName::CoveragePolicyQuery,
        StageName::SettlementRecommendation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::FnolIntelligence => "fnol_intelligence",
            StageName::SmartTriage => "smart_triage",
            StageName::FraudRadar => "fraud_radar",
            StageName::CoveragePolicyQuery => "coverage_policy_query",
            StageName::SettlementRecommendation => "settlement_recommendation",
        }
    }

    /// Zero-based position in the pipeline
    pub fn position(&self) -> usize {
        Self::ORDER
            .iter()
            .position(|stage| stage == self)
            .unwrap_or_default()
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a stage fell back to its deterministic rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackReason {
    NotConfigured,
    CollaboratorUnavailable,
    SchemaMismatch,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::NotConfigured => "not-configured",
            FallbackReason::CollaboratorUnavailable => "collaborator-unavailable",
            FallbackReason::SchemaMismatch => "schema-mismatch",
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which path produced a stage result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageSource {
    Collaborator { name: String },
    Fallback { reason: FallbackReason },
}

impl StageSource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, StageSource::Fallback { .. })
    }
}

impl fmt::Display for StageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageSource::Collaborator { name } => write!(f, "collaborator:{}", name),
            StageSource::Fallback { reason } => write!(f, "fallback:{}", reason),
        }
    }
}

/// A collaborator call that could not be used
///
/// Both variants are recovered inside the stage by running the fallback.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StageFailure {
    #[error("Collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),
}

impl StageFailure {
    pub fn schema(message: impl Into<String>) -> Self {
        StageFailure::SchemaMismatch(message.into())
    }

    pub fn reason(&self) -> FallbackReason {
        match self {
            StageFailure::CollaboratorUnavailable(_) => FallbackReason::CollaboratorUnavailable,
            StageFailure::SchemaMismatch(_) => FallbackReason::SchemaMismatch,
        }
    }
}

impl From<serde_json::Error> for StageFailure {
    fn from(err: serde_json::Error) -> Self {
        StageFailure::SchemaMismatch(err.to_string())
    }
}

/// Structured fields produced by a stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    Fnol(FnolAssessment),
    Triage(TriageAssessment),
    Fraud(FraudAssessment),
    Coverage(CoverageAssessment),
    Settlement(SettlementRecommendation),
}

impl StageOutcome {
    /// The stage that produces this kind of outcome
    pub fn stage(&self) -> StageName {
        match self {
            StageOutcome::Fnol(_) => StageName::FnolIntelligence,
            StageOutcome::Triage(_) => StageName::SmartTriage,
            StageOutcome::Fraud(_) => StageName::FraudRadar,
            StageOutcome::Coverage(_) => StageName::CoveragePolicyQuery,
            StageOutcome::Settlement(_) => StageName::SettlementRecommendation,
        }
    }
}

/// The immutable output of one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: StageName,
    pub rationale: String,
    pub outcome: StageOutcome,
    pub source: StageSource,
}

impl StageResult {
    pub fn fnol(&self) -> Option<&FnolAssessment> {
        match &self.outcome {
            StageOutcome::Fnol(a) => Some(a),
            _ => None,
        }
    }

    pub fn triage(&self) -> Option<&TriageAssessment> {
        match &self.outcome {
            StageOutcome::Triage(a) => Some(a),
            _ => None,
        }
    }

    pub fn fraud(&self) -> Option<&FraudAssessment> {
        match &self.outcome {
            StageOutcome::Fraud(a) => Some(a),
            _ => None,
        }
    }

    pub fn coverage(&self) -> Option<&CoverageAssessment> {
        match &self.outcome {
            StageOutcome::Coverage(a) => Some(a),
            _ => None,
        }
    }

    pub fn settlement(&self) -> Option<&SettlementRecommendation> {
        match &self.outcome {
            StageOutcome::Settlement(a) => Some(a),
            _ => None,
        }
    }
}

/// A stage's outcome with its rationale, before provenance is attached
#[derive(Debug, Clone, PartialEq)]
pub struct StageVerdict {
    pub outcome: StageOutcome,
    pub rationale: String,
}

impl StageVerdict {
    pub fn new(outcome: StageOutcome, rationale: impl Into<String>) -> Self {
        Self {
            outcome,
            rationale: rationale.into(),
        }
    }
}

/// Retrieval evidence gathered by a stage before it reasons
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageEvidence {
    /// Queries issued, in order
    pub queries: Vec<String>,
    /// Snippets scoped to the claim's policy
    pub snippets: Vec<PolicySnippet>,
    /// Set when the retrieval collaborator failed and local text was used
    pub retrieval_failed: bool,
}

/// Input handed to each stage method
#[derive(Debug, Clone, Copy)]
pub struct StageInput<'a> {
    pub state: &'a PipelineState,
    pub evidence: &'a StageEvidence,
}

/// One agent stage
///
/// `fallback` must be total: it always returns a valid verdict from the
/// stage input alone.
#[async_trait]
pub trait AgentStage: Send + Sync {
    fn name(&self) -> StageName;

    /// Gathers retrieval evidence; most stages need none
    async fn gather_evidence(&self, _state: &PipelineState) -> StageEvidence {
        StageEvidence::default()
    }

    /// Builds the least-privilege collaborator request
    fn compose_request(&self, input: StageInput<'_>) -> ReasoningRequest;

    /// Parses and validates a collaborator answer into this stage's schema
    fn interpret(&self, input: StageInput<'_>, content: &str) -> Result<StageVerdict, StageFailure>;

    /// Deterministic rules over the same input
    fn fallback(&self, input: StageInput<'_>) -> StageVerdict;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_positions() {
        for (index, stage) in StageName::ORDER.iter().enumerate() {
            assert_eq!(stage.position(), index);
        }
    }

    #[test]
    fn test_source_serialization() {
        let source = StageSource::Fallback {
            reason: FallbackReason::SchemaMismatch,
        };
        let json = serde_json::to_value(&source).unwrap();
        assert_eq!(json["kind"], "fallback");
        assert_eq!(json["reason"], "schema-mismatch");
        assert_eq!(source.to_string(), "fallback:schema-mismatch");
    }

    #[test]
    fn test_failure_reason() {
        assert_eq!(
            StageFailure::schema("bad").reason(),
            FallbackReason::SchemaMismatch
        );
    }
}
