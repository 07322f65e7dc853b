//! FNOL Intelligence
//!
//! Rates the severity of the first notice of loss and lists the next actions
//! an adjuster should take, in order.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

use domain_claims::ClaimRecord;
use domain_policy::PolicyDeclarations;

use crate::config::{PipelineConfig, SeverityThresholds};
use crate::reasoning::{extract_json, ReasoningRequest};
use crate::stage::{AgentStage, StageFailure, StageInput, StageName, StageOutcome, StageVerdict};

/// Severity tier of a loss
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    Low,
    Moderate,
    High,
    TotalLoss,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Moderate => "moderate",
            Severity::High => "high",
            Severity::TotalLoss => "total-loss",
        }
    }

    /// Tier for a claimed amount
    pub fn from_amount(amount: Decimal, thresholds: &SeverityThresholds) -> Self {
        if amount >= thresholds.total_loss {
            Severity::TotalLoss
        } else if amount >= thresholds.high {
            Severity::High
        } else if amount >= thresholds.moderate {
            Severity::Moderate
        } else {
            Severity::Low
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FnolAssessment {
    pub severity: Severity,
    pub next_actions: Vec<String>,
}

const TOTAL_LOSS_CUES: &[&str] = &["total loss", "totaled", "totalled", "total-loss", "written off"];
const POLICE_CUES: &[&str] = &["police", "officer", "citation", "hit and run", "hit-and-run", "stolen", "theft"];
const OTHER_PARTY_CUES: &[&str] = &[
    "rear-ended",
    "rear ended",
    "another vehicle",
    "other vehicle",
    "other driver",
    "other party",
    "collided with",
    "struck a",
];
const INJURY_CUES: &[&str] = &["injur", "hurt", "ambulance", "hospital", "whiplash"];

/// Deterministic severity: amount thresholds, overridden by a total-loss narrative
pub fn rate_severity(claim: &ClaimRecord, thresholds: &SeverityThresholds) -> Severity {
    if claim.narrative_mentions(TOTAL_LOSS_CUES) {
        return Severity::TotalLoss;
    }
    Severity::from_amount(claim.claimed_amount.amount(), thresholds)
}

/// Deterministic next actions for a loss of the given severity
pub fn next_actions(
    claim: &ClaimRecord,
    declarations: &PolicyDeclarations,
    severity: Severity,
) -> Vec<String> {
    let mut actions = vec!["Acknowledge claim receipt to the claimant".to_string()];

    if claim.narrative_mentions(POLICE_CUES) {
        actions.push("Obtain the police report".to_string());
    }
    if claim.narrative_mentions(OTHER_PARTY_CUES) {
        actions.push("Collect the other party's insurance information".to_string());
    }
    if claim.narrative_mentions(INJURY_CUES) {
        actions.push("Refer reported injuries for medical review".to_string());
    }
    if claim.is_commercial_use() {
        actions.push("Confirm how the vehicle was being used at the time of loss".to_string());
    }
    match severity {
        Severity::Low => actions.push("Request photos for a desk estimate".to_string()),
        Severity::Moderate | Severity::High => {
            actions.push("Schedule a vehicle damage inspection".to_string())
        }
        Severity::TotalLoss => {
            actions.push("Schedule a vehicle damage inspection".to_string());
            actions.push("Obtain an actual cash value valuation".to_string());
        }
    }
    if let Some(payee) = &declarations.loss_payee {
        actions.push(format!("Notify loss payee {}", payee.name));
    }
    actions.push("Verify coverage against the declarations page".to_string());
    actions
}

#[derive(Debug, Deserialize)]
struct FnolAnswer {
    severity: Severity,
    next_actions: Vec<String>,
    #[serde(default)]
    rationale: Option<String>,
}

/// FNOL Intelligence stage
#[derive(Debug, Clone)]
pub struct FnolStage {
    config: PipelineConfig,
}

impl FnolStage {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl AgentStage for FnolStage {
    fn name(&self) -> StageName {
        StageName::FnolIntelligence
    }

    fn compose_request(&self, input: StageInput<'_>) -> ReasoningRequest {
        let claim = input.state.claim();
        ReasoningRequest::new(
            self.name(),
            "Assess this first notice of loss. Respond with JSON: \
             {\"severity\": \"low|moderate|high|total-loss\", \
             \"next_actions\": [string], \"rationale\": string}",
            json!({
                "date_of_loss": claim.date_of_loss,
                "loss_description": claim.loss_description,
                "claimed_amount": claim.claimed_amount.amount(),
                "vehicle_details": claim.vehicle_details,
                "loss_location": claim.loss_location,
            }),
        )
        .with_max_tokens(self.config.max_tokens)
        .with_temperature(self.config.temperature)
    }

    fn interpret(&self, _input: StageInput<'_>, content: &str) -> Result<StageVerdict, StageFailure> {
        let answer: FnolAnswer = serde_json::from_str(extract_json(content))?;
        let next_actions: Vec<String> = answer
            .next_actions
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        if next_actions.is_empty() {
            return Err(StageFailure::schema("next_actions must not be empty"));
        }

        let rationale = answer
            .rationale
            .unwrap_or_else(|| format!("Severity assessed as {}", answer.severity));
        Ok(StageVerdict::new(
            StageOutcome::Fnol(FnolAssessment {
                severity: answer.severity,
                next_actions,
            }),
            rationale,
        ))
    }

    fn fallback(&self, input: StageInput<'_>) -> StageVerdict {
        let claim = input.state.claim();
        let severity = rate_severity(claim, &self.config.severity);
        let actions = next_actions(claim, input.state.declarations(), severity);

        let basis = if claim.narrative_mentions(TOTAL_LOSS_CUES) {
            "narrative describes a total loss".to_string()
        } else {
            format!("claimed amount {}", claim.claimed_amount)
        };
        StageVerdict::new(
            StageOutcome::Fnol(FnolAssessment {
                severity,
                next_actions: actions,
            }),
            format!("Severity {} based on {}", severity, basis),
        )
    }
}
