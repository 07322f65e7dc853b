//! Pipeline errors
//!
//! Only fatal conditions live here. Collaborator failures inside a stage are
//! [`crate::stage::StageFailure`]s and are recovered by the stage fallback.

use thiserror::Error;

use domain_claims::ClaimError;
use domain_policy::PolicyError;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The claim document failed validation; no stage ran
    #[error(transparent)]
    Validation(#[from] ClaimError),

    #[error("Policy not found: {0}")]
    PolicyNotFound(String),

    /// Declarations could not be loaded for a reason other than absence
    #[error("Policy context unavailable: {0}")]
    Policy(#[source] PolicyError),

    /// The formatter was handed fewer than five stages, or out of order
    #[error("Pipeline incomplete: {0}")]
    Incomplete(String),

    #[error("Pipeline cancelled at {0}")]
    Cancelled(String),
}

impl PipelineError {
    pub fn incomplete(message: impl Into<String>) -> Self {
        PipelineError::Incomplete(message.into())
    }

    pub fn cancelled(at: impl Into<String>) -> Self {
        PipelineError::Cancelled(at.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled(_))
    }
}

impl From<PolicyError> for PipelineError {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::PolicyNotFound(policy_number) => PipelineError::PolicyNotFound(policy_number),
            other => PipelineError::Policy(other),
        }
    }
}
