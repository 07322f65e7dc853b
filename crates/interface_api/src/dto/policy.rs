//! Policy DTOs

use serde::{Deserialize, Serialize};

use core_kernel::Money;
use domain_policy::{
    Coverage, CoverageType, DeclarationsSource, Endorsement, EndorsementKind, PolicyContext,
    PolicyPeriod,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct PolicyResponse {
    pub policy_number: String,
    pub named_insured: String,
    pub source: DeclarationsSource,
    pub policy_period: Option<PolicyPeriod>,
    pub vehicles: Vec<String>,
    pub coverages: Vec<CoverageResponse>,
    pub endorsements: Vec<EndorsementResponse>,
    pub special_provisions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CoverageResponse {
    pub coverage_type: CoverageType,
    pub section: String,
    pub label: String,
    pub limit: Option<Money>,
    pub deductible: Option<Money>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EndorsementResponse {
    pub form_number: String,
    pub title: String,
    pub kind: EndorsementKind,
    pub covered_activities: Vec<String>,
    pub deductible_override: Option<Money>,
}

impl From<&Coverage> for CoverageResponse {
    fn from(coverage: &Coverage) -> Self {
        Self {
            coverage_type: coverage.coverage_type,
            section: coverage.section().to_string(),
            label: coverage.label.clone(),
            limit: coverage.limit,
            deductible: coverage.deductible,
        }
    }
}

impl From<&Endorsement> for EndorsementResponse {
    fn from(endorsement: &Endorsement) -> Self {
        Self {
            form_number: endorsement.form_number.clone(),
            title: endorsement.title.clone(),
            kind: endorsement.kind,
            covered_activities: endorsement.covered_activities.clone(),
            deductible_override: endorsement.deductible_override,
        }
    }
}

impl From<PolicyContext> for PolicyResponse {
    fn from(context: PolicyContext) -> Self {
        let declarations = context.declarations;
        Self {
            policy_number: declarations.policy_number.to_string(),
            named_insured: declarations.named_insured,
            source: context.source,
            policy_period: declarations.policy_period,
            vehicles: declarations.vehicles,
            coverages: declarations.coverages.iter().map(CoverageResponse::from).collect(),
            endorsements: declarations.endorsements.iter().map(EndorsementResponse::from).collect(),
            special_provisions: declarations.special_provisions,
        }
    }
}
