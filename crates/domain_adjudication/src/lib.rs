//! Adjudication Domain
//!
//! Walks one loaded claim through five agent stages and formats the
//! decision record:
//!
//! - **FNOL Intelligence**: severity and ordered next actions
//! - **Smart Triage**: priority, adjuster persona and turnaround
//! - **Fraud Radar**: weighted indicator score, never a gate
//! - **Coverage / Policy Query**: section, endorsement tie-break, deductible
//!   and payout, with retrieval scoped to the claim's policy
//! - **Settlement Recommendation**: determination and payout under the
//!   fraud review guard
//!
//! Each stage may be backed by a [`ReasoningClient`]. When none is
//! configured, the call fails, or the answer does not validate, the stage
//! completes on deterministic rules and records why.

pub mod cancellation;
pub mod config;
pub mod decision;
pub mod error;
pub mod executor;
pub mod mock;
pub mod pipeline;
pub mod reasoning;
pub mod stage;
pub mod stages;
pub mod state;

pub use cancellation::CancellationToken;
pub use config::{PipelineConfig, SeverityThresholds};
pub use decision::{ClaimDecision, DecisionFormatter, PolicyReference};
pub use error::PipelineError;
pub use executor::StageExecutor;
pub use mock::{MockReasoningClient, MockReply};
pub use pipeline::ClaimPipeline;
pub use reasoning::{extract_json, ReasoningClient, ReasoningRequest, ReasoningResponse};
pub use stage::{
    AgentStage, FallbackReason, StageEvidence, StageFailure, StageInput, StageName, StageOutcome,
    StageResult, StageSource, StageVerdict,
};
pub use stages::{
    AdjusterPersona, CoverageAssessment, Determination, FnolAssessment, FraudAssessment, Priority,
    SettlementRecommendation, Severity, TriageAssessment,
};
pub use state::PipelineState;
