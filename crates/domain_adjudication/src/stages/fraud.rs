//! Fraud Radar
//!
//! Scores the claim for referral to the special investigations unit. The
//! score annotates the claim; it never stops the pipeline.

use std::collections::HashSet;

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::json;

use domain_claims::{ClaimRecord, UsageType};
use domain_policy::PolicyDeclarations;

use crate::config::PipelineConfig;
use crate::reasoning::{extract_json, ReasoningRequest};
use crate::stage::{AgentStage, StageFailure, StageInput, StageName, StageOutcome, StageVerdict};

pub const LATE_REPORTING: &str = "late-reporting";
pub const REPORTED_BEFORE_LOSS: &str = "reported-before-loss";
pub const HIGH_VALUE_CLAIM: &str = "high-value-claim";
pub const UNDISCLOSED_COMMERCIAL_USE: &str = "undisclosed-commercial-use";
pub const SPARSE_NARRATIVE: &str = "sparse-narrative";
pub const EARLY_POLICY_LOSS: &str = "early-policy-loss";
pub const LOSS_OUTSIDE_POLICY_PERIOD: &str = "loss-outside-policy-period";

/// Weight each flag contributes to the risk score
const FLAG_WEIGHTS: &[(&str, Decimal)] = &[
    (LATE_REPORTING, dec!(0.25)),
    (REPORTED_BEFORE_LOSS, dec!(0.35)),
    (HIGH_VALUE_CLAIM, dec!(0.15)),
    (UNDISCLOSED_COMMERCIAL_USE, dec!(0.25)),
    (SPARSE_NARRATIVE, dec!(0.10)),
    (EARLY_POLICY_LOSS, dec!(0.20)),
    (LOSS_OUTSIDE_POLICY_PERIOD, dec!(0.40)),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FraudAssessment {
    /// Risk score in [0, 1], two decimal places
    pub risk_score: Decimal,
    /// Named indicators, kebab-case
    pub flags: Vec<String>,
}

impl FraudAssessment {
    pub fn exceeds(&self, threshold: Decimal) -> bool {
        self.risk_score > threshold
    }
}

/// Clamps a score into [0, 1] at two decimal places, rounding half away from zero
pub fn clamp_score(score: Decimal) -> Decimal {
    score
        .max(Decimal::ZERO)
        .min(Decimal::ONE)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn weight(flag: &str) -> Decimal {
    FLAG_WEIGHTS
        .iter()
        .find(|(name, _)| *name == flag)
        .map(|(_, w)| *w)
        .unwrap_or(dec!(0.10))
}

/// Deterministic fraud indicators
pub fn detect_flags(
    claim: &ClaimRecord,
    declarations: &PolicyDeclarations,
    config: &PipelineConfig,
) -> Vec<&'static str> {
    let mut flags = Vec::new();

    if let Some(lag) = claim.reporting_lag_days() {
        if lag > config.late_reporting_days {
            flags.push(LATE_REPORTING);
        }
        if lag < 0 {
            flags.push(REPORTED_BEFORE_LOSS);
        }
    }
    if claim.claimed_amount.amount() > config.high_value_threshold {
        flags.push(HIGH_VALUE_CLAIM);
    }
    if claim.usage_type == UsageType::Personal && claim.indicates_commercial_activity() {
        flags.push(UNDISCLOSED_COMMERCIAL_USE);
    }
    if claim.loss_description.split_whitespace().count() < config.min_narrative_words {
        flags.push(SPARSE_NARRATIVE);
    }
    if let Some(period) = declarations.policy_period {
        if !period.contains(claim.date_of_loss) {
            flags.push(LOSS_OUTSIDE_POLICY_PERIOD);
        } else if period.days_since_inception(claim.date_of_loss) < config.early_policy_days {
            flags.push(EARLY_POLICY_LOSS);
        }
    }

    flags
}

/// Weighted score over the flags
pub fn score(flags: &[&str]) -> Decimal {
    clamp_score(flags.iter().map(|flag| weight(flag)).sum())
}

fn normalize_flag(flag: &str) -> String {
    flag.trim()
        .to_ascii_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[derive(Debug, Deserialize)]
struct FraudAnswer {
    risk_score: f64,
    #[serde(default)]
    flags: Vec<String>,
    #[serde(default)]
    rationale: Option<String>,
}

/// Fraud Radar stage
#[derive(Debug, Clone)]
pub struct FraudStage {
    config: PipelineConfig,
}

impl FraudStage {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl AgentStage for FraudStage {
    fn name(&self) -> StageName {
        StageName::FraudRadar
    }

    fn compose_request(&self, input: StageInput<'_>) -> ReasoningRequest {
        let claim = input.state.claim();
        let declarations = input.state.declarations();
        ReasoningRequest::new(
            self.name(),
            "Score this claim for fraud indicators. Respond with JSON: \
             {\"risk_score\": number between 0 and 1, \
             \"flags\": [kebab-case string], \"rationale\": string}",
            json!({
                "date_of_loss": claim.date_of_loss,
                "reported_date": claim.reported_date,
                "claimed_amount": claim.claimed_amount.amount(),
                "usage_type": claim.usage_type,
                "loss_description": claim.loss_description,
                "policy_period": declarations.policy_period,
            }),
        )
        .with_max_tokens(self.config.max_tokens)
        .with_temperature(self.config.temperature)
    }

    fn interpret(&self, _input: StageInput<'_>, content: &str) -> Result<StageVerdict, StageFailure> {
        let answer: FraudAnswer = serde_json::from_str(extract_json(content))?;
        if !answer.risk_score.is_finite() || !(0.0..=1.0).contains(&answer.risk_score) {
            return Err(StageFailure::schema(format!(
                "risk_score {} outside [0, 1]",
                answer.risk_score
            )));
        }
        let risk_score = Decimal::try_from(answer.risk_score)
            .map(clamp_score)
            .map_err(|e| StageFailure::schema(e.to_string()))?;

        let mut seen = HashSet::new();
        let flags: Vec<String> = answer
            .flags
            .iter()
            .map(|f| normalize_flag(f))
            .filter(|f| !f.is_empty() && seen.insert(f.clone()))
            .collect();

        let rationale = answer
            .rationale
            .unwrap_or_else(|| format!("Risk score {}", risk_score));
        Ok(StageVerdict::new(
            StageOutcome::Fraud(FraudAssessment { risk_score, flags }),
            rationale,
        ))
    }

    fn fallback(&self, input: StageInput<'_>) -> StageVerdict {
        let flags = detect_flags(input.state.claim(), input.state.declarations(), &self.config);
        let risk_score = score(&flags);

        let rationale = if flags.is_empty() {
            format!("No fraud indicators found; risk score {}", risk_score)
        } else {
            format!("Risk score {} from indicators: {}", risk_score, flags.join(", "))
        };
        StageVerdict::new(
            StageOutcome::Fraud(FraudAssessment {
                risk_score,
                flags: flags.into_iter().map(String::from).collect(),
            }),
            rationale,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_is_clamped() {
        let all: Vec<&str> = FLAG_WEIGHTS.iter().map(|(name, _)| *name).collect();
        assert_eq!(score(&all), Decimal::ONE);
        assert_eq!(score(&[]), Decimal::ZERO);
        assert_eq!(score(&[LATE_REPORTING, HIGH_VALUE_CLAIM]), dec!(0.40));
    }

    #[test]
    fn test_midpoint_score_rounds_up() {
        assert_eq!(clamp_score(dec!(0.505)), dec!(0.51));
        assert_eq!(clamp_score(dec!(0.504)), dec!(0.50));
        assert_eq!(clamp_score(dec!(1.2)), Decimal::ONE);
    }

    #[test]
    fn test_normalize_flag() {
        assert_eq!(normalize_flag("Inconsistent Mileage"), "inconsistent-mileage");
        assert_eq!(normalize_flag("late_reporting"), "late-reporting");
    }

    #[test]
    fn test_exceeds_is_strict() {
        let assessment = FraudAssessment {
            risk_score: dec!(0.5),
            flags: vec![],
        };
        assert!(!assessment.exceeds(dec!(0.5)));
        assert!(assessment.exceeds(dec!(0.49)));
    }
}
