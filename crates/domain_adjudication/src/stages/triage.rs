//! Smart Triage
//!
//! Routes the claim: a priority, the kind of adjuster who should own it and
//! the turnaround that priority promises.

use serde::{Deserialize, Serialize};
use serde_json::json;

use domain_claims::ClaimRecord;

use crate::config::PipelineConfig;
use crate::reasoning::{extract_json, ReasoningRequest};
use crate::stage::{AgentStage, StageFailure, StageInput, StageName, StageOutcome, StageVerdict};
use crate::stages::fnol::{rate_severity, Severity};

const MAX_TURNAROUND_HOURS: u32 = 720;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    Standard,
    Expedited,
    Urgent,
}

impl Priority {
    /// Service-level turnaround promised for the priority
    pub fn turnaround_hours(&self) -> u32 {
        match self {
            Priority::Urgent => 24,
            Priority::Expedited => 48,
            Priority::Standard => 120,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Standard => "standard",
            Priority::Expedited => "expedited",
            Priority::Urgent => "urgent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdjusterPersona {
    TotalLossSpecialist,
    CommercialAutoSpecialist,
    SeniorFieldAdjuster,
    DeskAdjuster,
    FastTrackDeskAdjuster,
}

impl AdjusterPersona {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjusterPersona::TotalLossSpecialist => "total-loss-specialist",
            AdjusterPersona::CommercialAutoSpecialist => "commercial-auto-specialist",
            AdjusterPersona::SeniorFieldAdjuster => "senior-field-adjuster",
            AdjusterPersona::DeskAdjuster => "desk-adjuster",
            AdjusterPersona::FastTrackDeskAdjuster => "fast-track-desk-adjuster",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageAssessment {
    pub priority: Priority,
    pub adjuster_persona: AdjusterPersona,
    pub target_turnaround_hours: u32,
}

/// Deterministic priority from usage and severity
pub fn route(severity: Severity, commercial: bool) -> (Priority, AdjusterPersona) {
    let priority = match (severity, commercial) {
        (Severity::TotalLoss, _) => Priority::Urgent,
        (Severity::High, true) => Priority::Urgent,
        (Severity::High, false) => Priority::Expedited,
        (Severity::Moderate, true) => Priority::Expedited,
        (Severity::Moderate, false) => Priority::Standard,
        (Severity::Low, _) => Priority::Standard,
    };
    let persona = match severity {
        Severity::TotalLoss => AdjusterPersona::TotalLossSpecialist,
        _ if commercial => AdjusterPersona::CommercialAutoSpecialist,
        Severity::High => AdjusterPersona::SeniorFieldAdjuster,
        Severity::Moderate => AdjusterPersona::DeskAdjuster,
        Severity::Low => AdjusterPersona::FastTrackDeskAdjuster,
    };
    (priority, persona)
}

#[derive(Debug, Deserialize)]
struct TriageAnswer {
    priority: Priority,
    adjuster_persona: AdjusterPersona,
    #[serde(default)]
    target_turnaround_hours: Option<u32>,
    #[serde(default)]
    rationale: Option<String>,
}

/// Smart Triage stage
#[derive(Debug, Clone)]
pub struct TriageStage {
    config: PipelineConfig,
}

impl TriageStage {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    fn severity(&self, input: StageInput<'_>) -> Severity {
        input
            .state
            .fnol()
            .map(|fnol| fnol.severity)
            .unwrap_or_else(|| rate_severity(input.state.claim(), &self.config.severity))
    }
}

#[async_trait::async_trait]
impl AgentStage for TriageStage {
    fn name(&self) -> StageName {
        StageName::SmartTriage
    }

    fn compose_request(&self, input: StageInput<'_>) -> ReasoningRequest {
        let claim: &ClaimRecord = input.state.claim();
        ReasoningRequest::new(
            self.name(),
            "Route this claim. Respond with JSON: \
             {\"priority\": \"standard|expedited|urgent\", \
             \"adjuster_persona\": \"total-loss-specialist|commercial-auto-specialist|\
             senior-field-adjuster|desk-adjuster|fast-track-desk-adjuster\", \
             \"target_turnaround_hours\": number, \"rationale\": string}",
            json!({
                "severity": self.severity(input),
                "usage_type": claim.usage_type,
                "commercial_activity_indicated": claim.indicates_commercial_activity(),
                "claimed_amount": claim.claimed_amount.amount(),
            }),
        )
        .with_max_tokens(self.config.max_tokens)
        .with_temperature(self.config.temperature)
    }

    fn interpret(&self, _input: StageInput<'_>, content: &str) -> Result<StageVerdict, StageFailure> {
        let answer: TriageAnswer = serde_json::from_str(extract_json(content))?;
        let hours = answer
            .target_turnaround_hours
            .unwrap_or_else(|| answer.priority.turnaround_hours());
        if hours == 0 || hours > MAX_TURNAROUND_HOURS {
            return Err(StageFailure::schema(format!(
                "target_turnaround_hours {} outside 1..={}",
                hours, MAX_TURNAROUND_HOURS
            )));
        }

        let rationale = answer.rationale.unwrap_or_else(|| {
            format!(
                "Routed {} to {}",
                answer.priority.as_str(),
                answer.adjuster_persona.as_str()
            )
        });
        Ok(StageVerdict::new(
            StageOutcome::Triage(TriageAssessment {
                priority: answer.priority,
                adjuster_persona: answer.adjuster_persona,
                target_turnaround_hours: hours,
            }),
            rationale,
        ))
    }

    fn fallback(&self, input: StageInput<'_>) -> StageVerdict {
        let severity = self.severity(input);
        let commercial = input.state.claim().is_commercial_use();
        let (priority, persona) = route(severity, commercial);
        let usage = if commercial { "commercial" } else { "personal" };

        StageVerdict::new(
            StageOutcome::Triage(TriageAssessment {
                priority,
                adjuster_persona: persona,
                target_turnaround_hours: priority.turnaround_hours(),
            }),
            format!(
                "{} severity on a {} use claim: {} priority, assigned to {} within {}h",
                severity,
                usage,
                priority.as_str(),
                persona.as_str(),
                priority.turnaround_hours()
            ),
        )
    }
}
