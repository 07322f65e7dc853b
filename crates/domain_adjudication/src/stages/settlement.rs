//! Settlement Recommendation
//!
//! Turns the coverage assessment and the fraud score into a determination
//! and a payout. A fraud score above the review threshold never auto-denies:
//! it caps the determination at partial and flags the claim for review,
//! whichever path produced the recommendation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

use core_kernel::Money;
use domain_claims::ClaimRecord;

use crate::config::PipelineConfig;
use crate::reasoning::{extract_json, ReasoningRequest};
use crate::stage::{AgentStage, StageFailure, StageInput, StageName, StageOutcome, StageVerdict};
use crate::stages::coverage::{determine_coverage, CoverageAssessment};
use crate::stages::fraud::{detect_flags, score, FraudAssessment};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Determination {
    Approved,
    Partial,
    Denied,
}

impl Determination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Determination::Approved => "approved",
            Determination::Partial => "partial",
            Determination::Denied => "denied",
        }
    }
}

impl std::fmt::Display for Determination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecommendation {
    pub determination: Determination,
    pub recommended_payout: Money,
    pub deductible: Money,
    pub review_required: bool,
}

/// Deterministic recommendation, before the fraud guard
pub fn recommend(claim: &ClaimRecord, coverage: &CoverageAssessment) -> (SettlementRecommendation, String) {
    let loss = claim.claimed_amount.amount();
    let deductible = coverage.deductible.amount();
    let zero = Money::usd(Decimal::ZERO);

    let (determination, payout, reason) = if !coverage.covered {
        (
            Determination::Denied,
            zero,
            format!(
                "Denied: {}",
                coverage.exclusion.as_deref().unwrap_or("loss is not covered")
            ),
        )
    } else if loss <= deductible {
        (
            Determination::Denied,
            zero,
            format!(
                "Denied: claimed loss {} does not exceed the {} deductible",
                claim.claimed_amount, coverage.deductible
            ),
        )
    } else {
        let net = loss - deductible;
        let capped = coverage.limit.map(|l| net > l.amount()).unwrap_or(false);
        if capped {
            (
                Determination::Partial,
                coverage.recommended_payout,
                format!(
                    "Partial: payout {} capped at the limit of {}",
                    coverage.recommended_payout, coverage.policy_section
                ),
            )
        } else {
            (
                Determination::Approved,
                coverage.recommended_payout,
                format!(
                    "Approved: {} claimed less {} deductible = {}",
                    claim.claimed_amount, coverage.deductible, coverage.recommended_payout
                ),
            )
        }
    };

    (
        SettlementRecommendation {
            determination,
            recommended_payout: payout,
            deductible: coverage.deductible,
            review_required: false,
        },
        reason,
    )
}

/// Caps an approval at partial and requires review when fraud risk exceeds `threshold`
///
/// Returns the note to append to the rationale, if the guard fired.
pub fn apply_fraud_guard(
    recommendation: &mut SettlementRecommendation,
    fraud: &FraudAssessment,
    threshold: Decimal,
) -> Option<String> {
    if !fraud.exceeds(threshold) {
        return None;
    }
    recommendation.review_required = true;
    if recommendation.determination == Determination::Approved {
        recommendation.determination = Determination::Partial;
        Some(format!(
            "Fraud risk {} exceeds review threshold {}: downgraded to partial pending SIU review",
            fraud.risk_score, threshold
        ))
    } else {
        Some(format!(
            "Fraud risk {} exceeds review threshold {}: referred for SIU review",
            fraud.risk_score, threshold
        ))
    }
}

#[derive(Debug, Deserialize)]
struct SettlementAnswer {
    determination: Determination,
    recommended_payout: f64,
    #[serde(default)]
    rationale: Option<String>,
}

/// Settlement Recommendation stage
#[derive(Debug, Clone)]
pub struct SettlementStage {
    config: PipelineConfig,
}

impl SettlementStage {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    fn coverage(&self, input: StageInput<'_>) -> CoverageAssessment {
        input
            .state
            .coverage()
            .cloned()
            .unwrap_or_else(|| determine_coverage(input.state.claim(), input.state.declarations()))
    }

    fn fraud(&self, input: StageInput<'_>) -> FraudAssessment {
        input.state.fraud().cloned().unwrap_or_else(|| {
            let flags = detect_flags(input.state.claim(), input.state.declarations(), &self.config);
            FraudAssessment {
                risk_score: score(&flags),
                flags: flags.into_iter().map(String::from).collect(),
            }
        })
    }

    fn guarded(
        &self,
        input: StageInput<'_>,
        mut recommendation: SettlementRecommendation,
        rationale: String,
    ) -> StageVerdict {
        let fraud = self.fraud(input);
        let rationale = match apply_fraud_guard(&mut recommendation, &fraud, self.config.fraud_review_threshold) {
            Some(note) => format!("{}. {}", rationale, note),
            None => rationale,
        };
        StageVerdict::new(StageOutcome::Settlement(recommendation), rationale)
    }
}

#[async_trait::async_trait]
impl AgentStage for SettlementStage {
    fn name(&self) -> StageName {
        StageName::SettlementRecommendation
    }

    fn compose_request(&self, input: StageInput<'_>) -> ReasoningRequest {
        let claim = input.state.claim();
        let coverage = self.coverage(input);
        let fraud = self.fraud(input);
        ReasoningRequest::new(
            self.name(),
            "Recommend a settlement. Respond with JSON: \
             {\"determination\": \"approved|partial|denied\", \
             \"recommended_payout\": number, \"rationale\": string}",
            json!({
                "claimed_amount": claim.claimed_amount.amount(),
                "covered": coverage.covered,
                "policy_section": coverage.policy_section,
                "deductible": coverage.deductible.amount(),
                "limit": coverage.limit.map(|l| l.amount()),
                "exclusion": coverage.exclusion,
                "maximum_payable": coverage.recommended_payout.amount(),
                "fraud_risk_score": fraud.risk_score,
            }),
        )
        .with_max_tokens(self.config.max_tokens)
        .with_temperature(self.config.temperature)
    }

    fn interpret(&self, input: StageInput<'_>, content: &str) -> Result<StageVerdict, StageFailure> {
        let answer: SettlementAnswer = serde_json::from_str(extract_json(content))?;
        let coverage = self.coverage(input);
        let maximum = coverage.recommended_payout.amount();

        if !answer.recommended_payout.is_finite() || answer.recommended_payout < 0.0 {
            return Err(StageFailure::schema("recommended_payout must be a non-negative number"));
        }
        let payout = Decimal::try_from(answer.recommended_payout)
            .map_err(|e| StageFailure::schema(e.to_string()))?
            .round_dp(2);
        if payout > maximum {
            return Err(StageFailure::schema(format!(
                "recommended_payout {} exceeds the payable maximum {}",
                payout, maximum
            )));
        }
        if !coverage.covered && answer.determination != Determination::Denied {
            return Err(StageFailure::schema("loss is not covered but answer is not a denial"));
        }
        if answer.determination == Determination::Denied && !payout.is_zero() {
            return Err(StageFailure::schema("a denial cannot carry a payout"));
        }

        let recommendation = SettlementRecommendation {
            determination: answer.determination,
            recommended_payout: Money::usd(payout),
            deductible: coverage.deductible,
            review_required: false,
        };
        let rationale = answer.rationale.unwrap_or_else(|| {
            format!("{}: payout {}", answer.determination, recommendation.recommended_payout)
        });
        Ok(self.guarded(input, recommendation, rationale))
    }

    fn fallback(&self, input: StageInput<'_>) -> StageVerdict {
        let coverage = self.coverage(input);
        let (recommendation, rationale) = recommend(input.state.claim(), &coverage);
        self.guarded(input, recommendation, rationale)
    }
}
