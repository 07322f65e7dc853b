//! Accumulating pipeline state
//!
//! The state starts with the loaded claim and its resolved policy context and
//! gains one [`StageResult`] per stage. It is never edited in place:
//! [`PipelineState::with_result`] consumes the state and returns the extended
//! one, so earlier results cannot be altered by later stages.

use domain_claims::ClaimRecord;
use domain_policy::{PolicyContext, PolicyDeclarations};

use crate::stage::{StageName, StageResult};
use crate::stages::coverage::CoverageAssessment;
use crate::stages::fnol::FnolAssessment;
use crate::stages::fraud::FraudAssessment;
use crate::stages::settlement::SettlementRecommendation;
use crate::stages::triage::TriageAssessment;

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineState {
    claim: ClaimRecord,
    context: PolicyContext,
    results: Vec<StageResult>,
}

impl PipelineState {
    pub fn new(claim: ClaimRecord, context: PolicyContext) -> Self {
        Self {
            claim,
            context,
            results: Vec::with_capacity(StageName::ORDER.len()),
        }
    }

    /// Appends a stage result
    pub fn with_result(mut self, result: StageResult) -> Self {
        self.results.push(result);
        self
    }

    pub fn claim(&self) -> &ClaimRecord {
        &self.claim
    }

    pub fn context(&self) -> &PolicyContext {
        &self.context
    }

    pub fn declarations(&self) -> &PolicyDeclarations {
        &self.context.declarations
    }

    pub fn results(&self) -> &[StageResult] {
        &self.results
    }

    /// The stage expected to run next, or `None` once all five have run
    pub fn next_stage(&self) -> Option<StageName> {
        StageName::ORDER.get(self.results.len()).copied()
    }

    pub fn result(&self, stage: StageName) -> Option<&StageResult> {
        self.results.iter().find(|r| r.stage == stage)
    }

    pub fn fnol(&self) -> Option<&FnolAssessment> {
        self.results.iter().find_map(StageResult::fnol)
    }

    pub fn triage(&self) -> Option<&TriageAssessment> {
        self.results.iter().find_map(StageResult::triage)
    }

    pub fn fraud(&self) -> Option<&FraudAssessment> {
        self.results.iter().find_map(StageResult::fraud)
    }

    pub fn coverage(&self) -> Option<&CoverageAssessment> {
        self.results.iter().find_map(StageResult::coverage)
    }

    pub fn settlement(&self) -> Option<&SettlementRecommendation> {
        self.results.iter().find_map(StageResult::settlement)
    }

    /// Splits the state into its parts
    pub fn into_parts(self) -> (ClaimRecord, PolicyContext, Vec<StageResult>) {
        (self.claim, self.context, self.results)
    }
}
