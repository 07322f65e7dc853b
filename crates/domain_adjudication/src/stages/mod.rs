//! The five agent stages, in pipeline order

pub mod fnol;
pub mod triage;
pub mod fraud;
pub mod coverage;
pub mod settlement;

pub use fnol::{FnolAssessment, FnolStage, Severity};
pub use triage::{AdjusterPersona, Priority, TriageAssessment, TriageStage};
pub use fraud::{FraudAssessment, FraudStage};
pub use coverage::{CoverageAssessment, CoverageStage};
pub use settlement::{Determination, SettlementRecommendation, SettlementStage};
