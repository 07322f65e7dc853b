//! Claim decision record and its formatter

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{DecisionId, Money, PolicyNumber};
use domain_claims::ClaimRecord;
use domain_policy::{DeclarationsSource, PolicyContext};

use crate::error::PipelineError;
use crate::stage::{StageName, StageResult};
use crate::stages::settlement::Determination;

/// The policy a decision was made against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyReference {
    pub policy_number: PolicyNumber,
    pub named_insured: String,
    pub source: DeclarationsSource,
}

/// Final, auditable output of the pipeline for one claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimDecision {
    pub decision_id: DecisionId,
    pub claim: ClaimRecord,
    pub policy: PolicyReference,
    /// The five stage results, in pipeline order
    pub stages: Vec<StageResult>,
    pub determination: Determination,
    pub covered: bool,
    pub recommended_payout: Money,
    pub deductible: Money,
    pub review_required: bool,
    pub fraud_risk_score: Decimal,
    pub notes: Vec<String>,
    pub decided_at: DateTime<Utc>,
}

impl ClaimDecision {
    pub fn stage(&self, stage: StageName) -> Option<&StageResult> {
        self.stages.iter().find(|r| r.stage == stage)
    }

    /// True when any stage completed on its fallback
    pub fn used_fallback(&self) -> bool {
        self.stages.iter().any(|r| r.source.is_fallback())
    }
}

/// Assembles the decision record from the five stage results
pub struct DecisionFormatter;

impl DecisionFormatter {
    /// # Errors
    ///
    /// `PipelineError::Incomplete` unless `stages` holds exactly the five
    /// stages in pipeline order.
    pub fn format(
        claim: ClaimRecord,
        context: &PolicyContext,
        stages: Vec<StageResult>,
    ) -> Result<ClaimDecision, PipelineError> {
        if stages.len() != StageName::ORDER.len() {
            return Err(PipelineError::incomplete(format!(
                "expected {} stage results, got {}",
                StageName::ORDER.len(),
                stages.len()
            )));
        }
        for (expected, result) in StageName::ORDER.iter().zip(&stages) {
            if result.stage != *expected || result.outcome.stage() != *expected {
                return Err(PipelineError::incomplete(format!(
                    "expected {} at position {}, got {}",
                    expected,
                    expected.position(),
                    result.stage
                )));
            }
        }

        let coverage = stages
            .iter()
            .find_map(StageResult::coverage)
            .ok_or_else(|| PipelineError::incomplete("coverage assessment missing"))?;
        let settlement = stages
            .iter()
            .find_map(StageResult::settlement)
            .ok_or_else(|| PipelineError::incomplete("settlement recommendation missing"))?;
        let fraud = stages
            .iter()
            .find_map(StageResult::fraud)
            .ok_or_else(|| PipelineError::incomplete("fraud assessment missing"))?;

        let mut notes = Vec::new();
        if let Some(tie_break) = &coverage.tie_break {
            notes.push(tie_break.clone());
        }
        if let Some(exclusion) = &coverage.exclusion {
            notes.push(format!("Exclusion: {}", exclusion));
        }
        if settlement.review_required {
            notes.push(format!(
                "Fraud risk {} ({}) requires SIU review",
                fraud.risk_score,
                if fraud.flags.is_empty() {
                    "no named flags".to_string()
                } else {
                    fraud.flags.join(", ")
                }
            ));
        }
        for result in stages.iter().filter(|r| r.source.is_fallback()) {
            notes.push(format!("{} completed on {}", result.stage, result.source));
        }

        let declarations = &context.declarations;
        Ok(ClaimDecision {
            decision_id: DecisionId::new_v7(),
            policy: PolicyReference {
                policy_number: declarations.policy_number.clone(),
                named_insured: declarations.named_insured.clone(),
                source: context.source.clone(),
            },
            determination: settlement.determination,
            covered: coverage.covered,
            recommended_payout: settlement.recommended_payout,
            deductible: settlement.deductible,
            review_required: settlement.review_required,
            fraud_risk_score: fraud.risk_score,
            notes,
            decided_at: Utc::now(),
            claim,
            stages,
        })
    }
}
