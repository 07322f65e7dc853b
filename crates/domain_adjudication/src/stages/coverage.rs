//! Coverage / Policy Query
//!
//! Works out which part of the policy governs the loss, what deductible and
//! limit apply, and whether an exclusion removes coverage.
//!
//! Candidate sections are the base form section for the loss type plus every
//! commercial-use endorsement that restores coverage for the activity in the
//! narrative. When an endorsement is among the candidates the most specific
//! one wins over the base section, and the tie-break is recorded.

use std::collections::HashSet;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use core_kernel::{Money, MoneyError};
use domain_claims::ClaimRecord;
use domain_policy::{
    scoped_snippets, CoverageType, Endorsement, PolicyDeclarations, PolicyRetriever,
    RetrievalQuery,
};

use crate::config::PipelineConfig;
use crate::reasoning::{extract_json, ReasoningRequest};
use crate::stage::{
    AgentStage, StageEvidence, StageFailure, StageInput, StageName, StageOutcome, StageVerdict,
};
use crate::state::PipelineState;

const COMPREHENSIVE_PERILS: &[&str] = &[
    "theft", "stolen", "vandal", "hail", "flood", "fire", "glass", "windshield", "animal", "deer",
];

/// Base-form exclusion for vehicles used for compensation
pub const COMMERCIAL_USE_EXCLUSION: &str =
    "Exclusion: vehicle used to carry persons or property for compensation or a fee";

const NARRATIVE_QUERY_CHARS: usize = 120;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageAssessment {
    pub coverage_type: CoverageType,
    /// The section that governs the loss
    pub policy_section: String,
    /// Every candidate section considered
    pub matched_sections: Vec<String>,
    /// Form number of the endorsement applied, if any
    pub endorsement: Option<String>,
    /// Why the endorsement won over the base section
    pub tie_break: Option<String>,
    pub deductible: Money,
    /// `None` means actual cash value
    pub limit: Option<Money>,
    pub covered: bool,
    pub exclusion: Option<String>,
    pub recommended_payout: Money,
    pub queries: Vec<String>,
    /// Retrieved snippet ids and local declarations references
    pub evidence: Vec<String>,
}

/// Coverage type implied by the narrative; collision unless a comprehensive peril is named
pub fn classify_loss(claim: &ClaimRecord) -> CoverageType {
    if claim.narrative_mentions(COMPREHENSIVE_PERILS) {
        CoverageType::Comprehensive
    } else {
        CoverageType::Collision
    }
}

/// Loss less deductible, floored at zero and capped at the limit
pub fn payout(loss: Money, deductible: Money, limit: Option<Money>) -> Result<Money, MoneyError> {
    let net = loss.saturating_sub(&deductible)?;
    match limit {
        Some(limit) if limit.checked_sub(&net)?.is_negative() => Ok(limit),
        _ => Ok(net),
    }
}

fn specificity(endorsement: &Endorsement) -> u8 {
    let mut rank = 1;
    if !endorsement.covered_activities.is_empty() {
        rank += 2;
    }
    if !endorsement.applies_to.is_empty() {
        rank += 1;
    }
    rank
}

/// The most specific endorsement applicable to a commercial-use loss; ties go to the first listed
fn most_specific<'a>(candidates: &[&'a Endorsement]) -> Option<&'a Endorsement> {
    candidates.iter().copied().fold(None::<&Endorsement>, |best, e| match best {
        Some(b) if specificity(b) >= specificity(e) => Some(b),
        _ => Some(e),
    })
}

fn local_evidence(declarations: &PolicyDeclarations, coverage_type: CoverageType, endorsement: Option<&Endorsement>) -> Vec<String> {
    let mut evidence = Vec::new();
    if declarations.has_coverage(coverage_type) {
        evidence.push(format!(
            "declarations:{}:coverage:{}",
            declarations.policy_number, coverage_type
        ));
    }
    if let Some(e) = endorsement {
        evidence.push(format!(
            "declarations:{}:endorsement:{}",
            declarations.policy_number, e.form_number
        ));
    }
    evidence
}

/// Deterministic coverage determination from the claim and declarations
pub fn determine_coverage(claim: &ClaimRecord, declarations: &PolicyDeclarations) -> CoverageAssessment {
    let coverage_type = classify_loss(claim);
    let base_section = coverage_type.base_section().to_string();

    let mut assessment = CoverageAssessment {
        coverage_type,
        policy_section: base_section.clone(),
        matched_sections: vec![base_section.clone()],
        endorsement: None,
        tie_break: None,
        deductible: Money::usd(Decimal::ZERO),
        limit: None,
        covered: false,
        exclusion: None,
        recommended_payout: Money::usd(Decimal::ZERO),
        queries: Vec::new(),
        evidence: Vec::new(),
    };

    if !declarations.in_force_on(claim.date_of_loss) {
        assessment.exclusion = Some(format!(
            "Date of loss {} is outside the policy period",
            claim.date_of_loss
        ));
        return assessment;
    }

    let Some(base) = declarations.coverage(coverage_type) else {
        assessment.exclusion = Some(format!(
            "No {} coverage is shown on the declarations",
            coverage_type
        ));
        return assessment;
    };
    assessment.deductible = base.deductible.unwrap_or_else(|| Money::usd(Decimal::ZERO));
    assessment.limit = base.limit;
    assessment.covered = true;

    if claim.is_commercial_use() {
        let candidates: Vec<&Endorsement> = declarations
            .commercial_endorsements()
            .filter(|e| e.applies_to_commercial_loss(coverage_type, &claim.loss_description))
            .collect();
        assessment
            .matched_sections
            .extend(candidates.iter().map(|e| e.section_name()));

        match most_specific(&candidates) {
            Some(endorsement) => {
                let section = endorsement.section_name();
                assessment.tie_break = Some(format!(
                    "{} and {} both apply; the more specific endorsement governs",
                    section, base_section
                ));
                assessment.policy_section = section;
                assessment.endorsement = Some(endorsement.form_number.clone());
                if let Some(deductible) = endorsement.deductible_override {
                    assessment.deductible = deductible;
                }
                if endorsement.limit_override.is_some() {
                    assessment.limit = endorsement.limit_override;
                }
            }
            None => {
                assessment.covered = false;
                assessment.exclusion = Some(if declarations.has_commercial_use_endorsement() {
                    format!(
                        "{}; the commercial-use endorsement does not extend to this activity",
                        COMMERCIAL_USE_EXCLUSION
                    )
                } else {
                    format!("{}; no commercial-use endorsement", COMMERCIAL_USE_EXCLUSION)
                });
            }
        }
    }

    if assessment.covered {
        match payout(claim.claimed_amount, assessment.deductible, assessment.limit) {
            Ok(amount) => assessment.recommended_payout = amount,
            Err(e) => {
                assessment.covered = false;
                assessment.exclusion = Some(format!("Payout cannot be computed: {}", e));
            }
        }
    }

    let endorsement = assessment.endorsement.as_ref().and_then(|form| {
        declarations
            .endorsements
            .iter()
            .find(|e| &e.form_number == form)
    });
    assessment.evidence = local_evidence(declarations, coverage_type, endorsement);
    assessment
}

/// Retrieval queries for a loss, at most `max`
pub fn compose_queries(claim: &ClaimRecord, coverage_type: CoverageType, max: usize) -> Vec<String> {
    let kind = coverage_type.as_str();
    let narrative: String = claim.loss_description.chars().take(NARRATIVE_QUERY_CHARS).collect();
    let exclusions = if claim.is_commercial_use() {
        "exclusions for vehicles used to carry persons or property for a fee".to_string()
    } else {
        format!("exclusions applicable to {} coverage", kind)
    };

    let mut queries = vec![
        format!("{} coverage conditions for: {}", kind, narrative),
        format!("{} deductible", kind),
        format!("settlement calculation for {} losses", kind),
        exclusions,
        format!("limit of liability for {} coverage", kind),
    ];
    queries.truncate(max);
    queries
}

fn describe(assessment: &CoverageAssessment) -> String {
    let mut parts = Vec::new();
    if assessment.covered {
        parts.push(format!(
            "{} loss covered under {} with a {} deductible; recommended payout {}",
            assessment.coverage_type,
            assessment.policy_section,
            assessment.deductible,
            assessment.recommended_payout
        ));
    } else {
        parts.push(format!(
            "{} loss not covered under {}",
            assessment.coverage_type, assessment.policy_section
        ));
    }
    if let Some(tie_break) = &assessment.tie_break {
        parts.push(format!("Tie-break: {}", tie_break));
    }
    if let Some(exclusion) = &assessment.exclusion {
        parts.push(exclusion.clone());
    }
    parts.join(". ")
}

#[derive(Debug, Deserialize)]
struct CoverageAnswer {
    covered: bool,
    #[serde(default)]
    policy_section: Option<String>,
    #[serde(default)]
    deductible: Option<f64>,
    #[serde(default)]
    exclusion: Option<String>,
    #[serde(default)]
    rationale: Option<String>,
}

/// Coverage / Policy Query stage
#[derive(Clone)]
pub struct CoverageStage {
    config: PipelineConfig,
    retriever: Option<Arc<dyn PolicyRetriever>>,
}

impl CoverageStage {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            retriever: None,
        }
    }

    pub fn with_retriever(mut self, retriever: Option<Arc<dyn PolicyRetriever>>) -> Self {
        self.retriever = retriever;
        self
    }

    fn with_evidence(&self, mut assessment: CoverageAssessment, evidence: &StageEvidence) -> CoverageAssessment {
        let local = std::mem::take(&mut assessment.evidence);
        assessment.queries = evidence.queries.clone();
        assessment.evidence = evidence
            .snippets
            .iter()
            .map(|s| s.id.clone())
            .chain(local)
            .collect();
        assessment
    }
}

impl std::fmt::Debug for CoverageStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoverageStage")
            .field("retriever", &self.retriever.as_ref().map(|r| r.name().to_string()))
            .finish()
    }
}

#[async_trait::async_trait]
impl AgentStage for CoverageStage {
    fn name(&self) -> StageName {
        StageName::CoveragePolicyQuery
    }

    async fn gather_evidence(&self, state: &PipelineState) -> StageEvidence {
        let claim = state.claim();
        let mut evidence = StageEvidence {
            queries: compose_queries(claim, classify_loss(claim), self.config.max_policy_queries),
            ..StageEvidence::default()
        };
        let Some(retriever) = &self.retriever else {
            return evidence;
        };

        let mut seen = HashSet::new();
        for text in &evidence.queries {
            let query = RetrievalQuery::new(text.clone())
                .scoped_to(&claim.policy_number)
                .with_top_k(self.config.retrieval_top_k);
            match self
                .config
                .retry
                .run("retrieve policy sections", || retriever.retrieve(&query))
                .await
            {
                Ok(snippets) => {
                    for snippet in scoped_snippets(&claim.policy_number, snippets) {
                        if seen.insert(snippet.id.clone()) {
                            evidence.snippets.push(snippet);
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        collaborator = retriever.name(),
                        error = %e,
                        "Policy section retrieval failed, using local declarations"
                    );
                    evidence.retrieval_failed = true;
                    break;
                }
            }
        }

        debug!(
            queries = evidence.queries.len(),
            snippets = evidence.snippets.len(),
            "Coverage evidence gathered"
        );
        evidence
    }

    fn compose_request(&self, input: StageInput<'_>) -> ReasoningRequest {
        let claim = input.state.claim();
        let declarations = input.state.declarations();
        let candidates = determine_coverage(claim, declarations).matched_sections;
        let endorsements: Vec<_> = declarations
            .endorsements
            .iter()
            .map(|e| {
                json!({
                    "form_number": e.form_number,
                    "title": e.title,
                    "kind": e.kind,
                    "covered_activities": e.covered_activities,
                    "waives_exclusions": e.waives_exclusions,
                })
            })
            .collect();
        let evidence: Vec<_> = input
            .evidence
            .snippets
            .iter()
            .map(|s| json!({ "id": s.id, "text": s.text }))
            .collect();

        ReasoningRequest::new(
            self.name(),
            "Identify the policy section governing this loss. Prefer the most specific \
             applicable endorsement over the base section. Respond with JSON: \
             {\"covered\": bool, \"policy_section\": string, \"deductible\": number, \
             \"exclusion\": string or null, \"rationale\": string}",
            json!({
                "loss_description": claim.loss_description,
                "usage_type": claim.usage_type,
                "commercial_activity_indicated": claim.indicates_commercial_activity(),
                "claimed_amount": claim.claimed_amount.amount(),
                "date_of_loss": claim.date_of_loss,
                "policy_period": declarations.policy_period,
                "coverages": declarations.coverages,
                "endorsements": endorsements,
                "candidate_sections": candidates,
                "evidence": evidence,
            }),
        )
        .with_max_tokens(self.config.max_tokens)
        .with_temperature(self.config.temperature)
    }

    fn interpret(&self, input: StageInput<'_>, content: &str) -> Result<StageVerdict, StageFailure> {
        let answer: CoverageAnswer = serde_json::from_str(extract_json(content))?;
        let claim = input.state.claim();
        let expected = determine_coverage(claim, input.state.declarations());

        let section = answer
            .policy_section
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| expected.policy_section.clone());

        if let Some(form) = &expected.endorsement {
            let upper = section.to_ascii_uppercase();
            let cites_endorsement = upper.contains(&form.to_ascii_uppercase())
                || upper.contains("COMMERCIAL USE");
            if !answer.covered || !cites_endorsement {
                return Err(StageFailure::schema(format!(
                    "answer contradicts the endorsement tie-break in favour of {}",
                    expected.policy_section
                )));
            }
        }
        if answer.covered && !expected.covered {
            return Err(StageFailure::schema(
                "answer asserts coverage the declarations do not provide",
            ));
        }

        // The deductible is fixed by the declarations or the governing endorsement
        if let Some(d) = answer.deductible {
            if !d.is_finite() || d < 0.0 {
                return Err(StageFailure::schema(format!("deductible {} is not valid", d)));
            }
            let stated = Decimal::try_from(d).map_err(|e| StageFailure::schema(e.to_string()))?;
            if answer.covered && stated != expected.deductible.amount() {
                return Err(StageFailure::schema(format!(
                    "deductible {} contradicts the declared {}",
                    stated, expected.deductible
                )));
            }
        }

        let mut assessment = CoverageAssessment {
            policy_section: section,
            covered: answer.covered,
            exclusion: if answer.covered {
                None
            } else {
                answer.exclusion.or(expected.exclusion.clone())
            },
            ..expected
        };
        assessment.recommended_payout = if assessment.covered {
            payout(claim.claimed_amount, assessment.deductible, assessment.limit)
                .map_err(|e| StageFailure::schema(e.to_string()))?
        } else {
            Money::usd(Decimal::ZERO)
        };
        let assessment = self.with_evidence(assessment, input.evidence);

        let mut rationale = answer.rationale.unwrap_or_else(|| describe(&assessment));
        if let Some(tie_break) = &assessment.tie_break {
            if !rationale.contains(tie_break.as_str()) {
                rationale.push_str(&format!(". Tie-break: {}", tie_break));
            }
        }
        Ok(StageVerdict::new(StageOutcome::Coverage(assessment), rationale))
    }

    fn fallback(&self, input: StageInput<'_>) -> StageVerdict {
        let assessment = determine_coverage(input.state.claim(), input.state.declarations());
        let assessment = self.with_evidence(assessment, input.evidence);

        let mut rationale = describe(&assessment);
        if input.evidence.retrieval_failed {
            rationale.push_str(". Retrieval unavailable; local declarations used");
        }
        StageVerdict::new(StageOutcome::Coverage(assessment), rationale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    #[test]
    fn test_payout() {
        let usd = |amount| Money::usd(amount);
        assert_eq!(payout(usd(dec!(3200)), usd(dec!(500)), None).unwrap(), usd(dec!(2700)));
        assert!(payout(usd(dec!(400)), usd(dec!(500)), None).unwrap().is_zero());
        assert_eq!(
            payout(usd(dec!(30000)), usd(dec!(500)), Some(usd(dec!(20000)))).unwrap(),
            usd(dec!(20000))
        );
    }

    #[test]
    fn test_payout_rejects_mixed_currencies() {
        let loss = Money::usd(dec!(3200));
        let deductible = Money::new(dec!(500), Currency::EUR);
        assert!(matches!(
            payout(loss, deductible, None),
            Err(MoneyError::CurrencyMismatch(_, _))
        ));
    }

    #[test]
    fn test_specificity_prefers_named_activities() {
        let blanket = Endorsement::new("PP 03 01", "Business Use Endorsement");
        let named = Endorsement::new("PP 03 06", "Commercial Use Endorsement")
            .with_activities(["pizza delivery"]);
        assert_eq!(most_specific(&[&blanket, &named]).unwrap().form_number, "PP 03 06");
        assert_eq!(most_specific(&[&named, &blanket]).unwrap().form_number, "PP 03 06");
        assert!(most_specific(&[]).is_none());
    }
}
